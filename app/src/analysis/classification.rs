// ==============================================================================
// analysis/classification.rs - Quality filter and significance buckets
// ==============================================================================
// Description: Core classification sub-analysis
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use crate::models::{AnalysisSummary, ClinicalSignificance, VariantRecord};

/// Variants passing the quality threshold plus per-class counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub passing: Vec<VariantRecord>,
    pub filtered: usize,
    pub pathogenic: usize,
    pub likely_pathogenic: usize,
    pub uncertain_significance: usize,
    pub likely_benign: usize,
    pub benign: usize,
}

impl Classification {
    /// Copy the counts into a run summary
    pub fn apply_to(&self, summary: &mut AnalysisSummary) {
        summary.total_variants = self.passing.len();
        summary.filtered_variants = self.filtered;
        summary.pathogenic_variants = self.pathogenic;
        summary.likely_pathogenic_variants = self.likely_pathogenic;
        summary.vus_variants = self.uncertain_significance;
        summary.likely_benign_variants = self.likely_benign;
        summary.benign_variants = self.benign;
    }
}

/// Variants whose call quality is at least `threshold`, in input order
pub fn passing_variants(variants: &[VariantRecord], threshold: f64) -> impl Iterator<Item = &VariantRecord> {
    variants.iter().filter(move |v| v.passes_quality(threshold))
}

pub fn classify(variants: &[VariantRecord], threshold: f64) -> Classification {
    let mut result = Classification::default();

    for variant in passing_variants(variants, threshold) {
        match variant.clinical_significance {
            ClinicalSignificance::Pathogenic => result.pathogenic += 1,
            ClinicalSignificance::LikelyPathogenic => result.likely_pathogenic += 1,
            ClinicalSignificance::UncertainSignificance => result.uncertain_significance += 1,
            ClinicalSignificance::LikelyBenign => result.likely_benign += 1,
            ClinicalSignificance::Benign => result.benign += 1,
        }
        result.passing.push(variant.clone());
    }

    result.filtered = variants.len() - result.passing.len();
    result
}
