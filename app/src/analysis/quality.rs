// ==============================================================================
// analysis/quality.rs - Sequencing quality metrics
// ==============================================================================
// Description: Depth, call quality, Ti/Tv and het/hom summaries
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use crate::models::{QualityMetrics, VariantRecord, Zygosity};

/// Compute metrics over an already filtered variant set.
///
/// Every field is finite and non-negative. An empty set gives all zeros and a
/// ratio with a zero denominator reports 0.
pub fn compute<'a, I>(variants: I) -> QualityMetrics
where
    I: IntoIterator<Item = &'a VariantRecord>,
{
    let mut count = 0usize;
    let mut depth_sum = 0f64;
    let mut quality_sum = 0f64;
    let mut at_10x = 0usize;
    let mut at_20x = 0usize;
    let mut at_30x = 0usize;
    let mut transitions = 0usize;
    let mut transversions = 0usize;
    let mut heterozygous = 0usize;
    let mut homozygous = 0usize;

    for variant in variants {
        count += 1;
        depth_sum += variant.depth as f64;
        quality_sum += variant.quality;

        if variant.depth >= 10 {
            at_10x += 1;
        }
        if variant.depth >= 20 {
            at_20x += 1;
        }
        if variant.depth >= 30 {
            at_30x += 1;
        }

        match substitution_class(variant) {
            Some(Substitution::Transition) => transitions += 1,
            Some(Substitution::Transversion) => transversions += 1,
            None => {}
        }

        match variant.zygosity {
            Zygosity::Heterozygous => heterozygous += 1,
            Zygosity::Homozygous => homozygous += 1,
            Zygosity::Hemizygous => {}
        }
    }

    QualityMetrics {
        mean_depth: ratio(depth_sum, count as f64),
        mean_quality: ratio(quality_sum, count as f64),
        pct_depth_10x: ratio(at_10x as f64 * 100.0, count as f64),
        pct_depth_20x: ratio(at_20x as f64 * 100.0, count as f64),
        pct_depth_30x: ratio(at_30x as f64 * 100.0, count as f64),
        ti_tv_ratio: ratio(transitions as f64, transversions as f64),
        het_hom_ratio: ratio(heterozygous as f64, homozygous as f64),
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        let value = numerator / denominator;
        if value.is_finite() && value >= 0.0 {
            return value;
        }
    }
    0.0
}

enum Substitution {
    Transition,
    Transversion,
}

/// Purine<->purine and pyrimidine<->pyrimidine changes are transitions
fn substitution_class(variant: &VariantRecord) -> Option<Substitution> {
    if !variant.is_snv() {
        return None;
    }
    let reference = variant.reference.chars().next()?.to_ascii_uppercase();
    let alternate = variant.alternate.chars().next()?.to_ascii_uppercase();

    match (reference, alternate) {
        ('A', 'G') | ('G', 'A') | ('C', 'T') | ('T', 'C') => Some(Substitution::Transition),
        (r, a) if r != a && "ACGT".contains(r) && "ACGT".contains(a) => Some(Substitution::Transversion),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classification::tests::variant;
    use crate::models::ClinicalSignificance;

    fn all_fields(metrics: &QualityMetrics) -> [f64; 7] {
        [
            metrics.mean_depth,
            metrics.mean_quality,
            metrics.pct_depth_10x,
            metrics.pct_depth_20x,
            metrics.pct_depth_30x,
            metrics.ti_tv_ratio,
            metrics.het_hom_ratio,
        ]
    }

    #[test]
    fn test_empty_input_is_zero() {
        let metrics = compute(std::iter::empty());
        for value in all_fields(&metrics) {
            assert!(value.is_finite());
            assert_eq!(value, 0.0);
        }
    }

    #[test]
    fn test_metrics_over_variants() {
        let mut transition = variant("v1", "BRCA1", ClinicalSignificance::Benign, 30.0);
        transition.depth = 40;

        let mut transversion = variant("v2", "BRCA2", ClinicalSignificance::Benign, 50.0);
        transversion.alternate = "T".to_string();
        transversion.depth = 15;
        transversion.zygosity = Zygosity::Homozygous;

        let mut indel = variant("v3", "TP53", ClinicalSignificance::Benign, 40.0);
        indel.alternate = "AT".to_string();
        indel.depth = 5;

        let variants = vec![transition, transversion, indel];
        let metrics = compute(&variants);

        assert_eq!(metrics.mean_depth, 20.0);
        assert_eq!(metrics.mean_quality, 40.0);
        assert!((metrics.pct_depth_10x - 200.0 / 3.0).abs() < 1e-9);
        assert!((metrics.pct_depth_30x - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.ti_tv_ratio, 1.0);
        assert_eq!(metrics.het_hom_ratio, 2.0);
    }

    #[test]
    fn test_undefined_ratios_report_zero() {
        let variants = vec![variant("v1", "BRCA1", ClinicalSignificance::Benign, 30.0)];
        let metrics = compute(&variants);
        assert_eq!(metrics.ti_tv_ratio, 0.0);
        assert_eq!(metrics.het_hom_ratio, 0.0);
        assert!(all_fields(&metrics).iter().all(|v| v.is_finite() && *v >= 0.0));
    }
}
