// ==============================================================================
// parsers/record.rs - Partially parsed variant records
// ==============================================================================
// Description: Fields read from a payload, completed from annotations/defaults
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use crate::annotation::{VariantAnnotation, VariantLocus};
use crate::models::{Annotation, ClinicalSignificance, VariantRecord, Zygosity};

const UNKNOWN_GENE: &str = "UNKNOWN";
const DEFAULT_GENOTYPE: &str = "0/1";

/// Variant fields as found in the payload; only the locus is guaranteed
#[derive(Debug, Clone, Default)]
pub struct PartialVariant {
    pub id: Option<String>,
    pub chromosome: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub gene: Option<String>,
    pub transcript: Option<String>,
    pub consequence: Option<String>,
    pub clinical_significance: Option<ClinicalSignificance>,
    pub allele_frequency: Option<f64>,
    pub zygosity: Option<Zygosity>,
    pub depth: Option<u32>,
    pub quality: Option<f64>,
    pub genotype: Option<String>,
    pub vaf: Option<f64>,
    /// Reference and alternate read depths (VCF AD)
    pub allele_depths: Option<(u32, u32)>,
    pub annotations: Vec<Annotation>,
}

impl PartialVariant {
    pub fn locus(&self) -> VariantLocus {
        VariantLocus {
            chromosome: self.chromosome.clone(),
            position: self.position,
            reference: self.reference.clone(),
            alternate: self.alternate.clone(),
        }
    }

    /// Build the final record.
    ///
    /// Payload values win over annotation values; anything still missing
    /// falls back to a deterministic default.
    pub fn complete(self, annotation: Option<VariantAnnotation>) -> VariantRecord {
        let annotation = annotation.unwrap_or_default();

        let id = self.id.unwrap_or_else(|| {
            format!(
                "{}:{}:{}:{}",
                self.chromosome, self.position, self.reference, self.alternate
            )
        });

        let consequence = self
            .consequence
            .or(annotation.consequence)
            .unwrap_or_else(|| allele_shape(&self.reference, &self.alternate).to_string());

        let genotype = self.genotype.unwrap_or_else(|| DEFAULT_GENOTYPE.to_string());
        let zygosity = self
            .zygosity
            .or_else(|| Zygosity::from_genotype(&genotype))
            .unwrap_or(Zygosity::Heterozygous);

        let vaf = self
            .vaf
            .or_else(|| {
                self.allele_depths.and_then(|(ref_depth, alt_depth)| {
                    let total = ref_depth + alt_depth;
                    (total > 0).then(|| alt_depth as f64 / total as f64)
                })
            })
            .unwrap_or(match zygosity {
                Zygosity::Heterozygous => 0.5,
                Zygosity::Homozygous | Zygosity::Hemizygous => 1.0,
            });

        let depth = self.depth.unwrap_or_else(|| {
            self.allele_depths
                .map(|(ref_depth, alt_depth)| ref_depth + alt_depth)
                .unwrap_or(0)
        });

        let mut annotations = self.annotations;
        annotations.extend(annotation.annotations);

        VariantRecord {
            id,
            chromosome: self.chromosome,
            position: self.position,
            reference: self.reference,
            alternate: self.alternate,
            gene: self
                .gene
                .or(annotation.gene)
                .unwrap_or_else(|| UNKNOWN_GENE.to_string()),
            transcript: self.transcript.or(annotation.transcript),
            consequence,
            clinical_significance: self
                .clinical_significance
                .or(annotation.clinical_significance)
                .unwrap_or(ClinicalSignificance::UncertainSignificance),
            allele_frequency: self
                .allele_frequency
                .or(annotation.population_frequency)
                .unwrap_or(0.0),
            zygosity,
            depth,
            quality: self.quality.unwrap_or(0.0),
            genotype,
            vaf,
            annotations,
        }
    }
}

/// Coarse consequence class from allele lengths
pub fn allele_shape(reference: &str, alternate: &str) -> &'static str {
    match (reference.len(), alternate.len()) {
        (1, 1) => "snv",
        (r, a) if r == a => "mnv",
        (1, a) if a > 1 && alternate.starts_with(reference) => "insertion",
        (r, 1) if r > 1 && reference.starts_with(alternate) => "deletion",
        _ => "indel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial() -> PartialVariant {
        PartialVariant {
            chromosome: "17".to_string(),
            position: 43044295,
            reference: "A".to_string(),
            alternate: "G".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_allele_shape() {
        assert_eq!(allele_shape("A", "G"), "snv");
        assert_eq!(allele_shape("AC", "GT"), "mnv");
        assert_eq!(allele_shape("A", "AT"), "insertion");
        assert_eq!(allele_shape("AT", "A"), "deletion");
        assert_eq!(allele_shape("AT", "GCC"), "indel");
    }

    #[test]
    fn test_defaults() {
        let record = partial().complete(None);
        assert_eq!(record.id, "17:43044295:A:G");
        assert_eq!(record.gene, "UNKNOWN");
        assert_eq!(record.consequence, "snv");
        assert_eq!(record.zygosity, Zygosity::Heterozygous);
        assert_eq!(record.vaf, 0.5);
        assert_eq!(record.depth, 0);
        assert_eq!(record.quality, 0.0);
    }

    #[test]
    fn test_vaf_from_allele_depths() {
        let mut p = partial();
        p.allele_depths = Some((30, 10));
        let record = p.complete(None);
        assert_eq!(record.vaf, 0.25);
        assert_eq!(record.depth, 40);
    }

    #[test]
    fn test_payload_wins_over_annotation() {
        let mut p = partial();
        p.gene = Some("BRCA1".to_string());
        let record = p.complete(Some(VariantAnnotation {
            gene: Some("OTHER".to_string()),
            transcript: Some("NM_007294.4".to_string()),
            ..Default::default()
        }));
        assert_eq!(record.gene, "BRCA1");
        assert_eq!(record.transcript.as_deref(), Some("NM_007294.4"));
    }

    #[test]
    fn test_homozygous_genotype() {
        let mut p = partial();
        p.genotype = Some("1/1".to_string());
        let record = p.complete(None);
        assert_eq!(record.zygosity, Zygosity::Homozygous);
        assert_eq!(record.vaf, 1.0);
    }
}
