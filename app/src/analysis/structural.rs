// ==============================================================================
// analysis/structural.rs - Structural and copy-number variant relevance
// ==============================================================================
// Description: Assigns clinical-relevance text to SV and CNV calls
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use crate::models::{CopyNumberType, CopyNumberVariant, StructuralVariant, StructuralVariantType};

/// Genes whose copy number is clinically significant (ClinGen dosage curation)
const DOSAGE_SENSITIVE_GENES: &[&str] = &[
    "APC", "BRCA1", "BRCA2", "DMD", "ELN", "ERBB2", "MECP2", "MLH1", "MSH2", "MYC", "NF1",
    "NSD1", "PMP22", "PTEN", "RAI1", "SHANK3", "SMN1", "SNRPN", "TBX1", "TP53", "UBE3A",
];

/// Genes where losing one copy is sufficient to cause disease
const HAPLOINSUFFICIENT_GENES: &[&str] = &[
    "APC", "BRCA1", "BRCA2", "DMD", "ELN", "MLH1", "MSH2", "NF1", "NSD1", "PTEN", "RAI1",
    "SHANK3", "TBX1", "TP53",
];

const LARGE_EVENT_BP: u64 = 1_000_000;

const UNCERTAIN: &str = "uncertain clinical relevance";

fn matching<'a>(genes: &'a [String], table: &[&str]) -> Vec<&'a str> {
    genes
        .iter()
        .filter(|g| table.iter().any(|t| t.eq_ignore_ascii_case(g.as_str())))
        .map(String::as_str)
        .collect()
}

fn megabases(size: u64) -> String {
    format!("{:.1} Mb", size as f64 / 1_000_000.0)
}

/// Relevance for one structural variant
pub fn structural_relevance(sv: &StructuralVariant) -> String {
    let dosage = matching(&sv.affected_genes, DOSAGE_SENSITIVE_GENES);
    let changes_dosage = matches!(
        sv.sv_type,
        StructuralVariantType::Deletion | StructuralVariantType::Duplication
    );

    if !dosage.is_empty() && changes_dosage {
        format!("potentially pathogenic: alters dosage of {}", dosage.join(", "))
    } else if !dosage.is_empty() {
        format!("potentially pathogenic: disrupts dosage-sensitive gene {}", dosage.join(", "))
    } else if sv.size >= LARGE_EVENT_BP {
        format!("potentially pathogenic: large event ({})", megabases(sv.size))
    } else {
        UNCERTAIN.to_string()
    }
}

/// Relevance for one copy-number variant
pub fn copy_number_relevance(cnv: &CopyNumberVariant) -> String {
    let size = cnv.end.saturating_sub(cnv.start);

    if cnv.cnv_type == CopyNumberType::Loss {
        let haploinsufficient = matching(&cnv.affected_genes, HAPLOINSUFFICIENT_GENES);
        if !haploinsufficient.is_empty() {
            return format!(
                "likely pathogenic: copy-number loss of haploinsufficient gene {}",
                haploinsufficient.join(", ")
            );
        }
    }

    let dosage = matching(&cnv.affected_genes, DOSAGE_SENSITIVE_GENES);
    if !dosage.is_empty() {
        format!(
            "potentially pathogenic: copy number {} across dosage-sensitive gene {}",
            cnv.copy_number,
            dosage.join(", ")
        )
    } else if size >= LARGE_EVENT_BP {
        format!("potentially pathogenic: large event ({})", megabases(size))
    } else {
        UNCERTAIN.to_string()
    }
}

pub fn annotate_structural(variants: &[StructuralVariant]) -> Vec<StructuralVariant> {
    variants
        .iter()
        .map(|sv| StructuralVariant {
            clinical_relevance: structural_relevance(sv),
            ..sv.clone()
        })
        .collect()
}

pub fn annotate_copy_number(variants: &[CopyNumberVariant]) -> Vec<CopyNumberVariant> {
    variants
        .iter()
        .map(|cnv| CopyNumberVariant {
            clinical_relevance: copy_number_relevance(cnv),
            ..cnv.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(sv_type: StructuralVariantType, size: u64, genes: &[&str]) -> StructuralVariant {
        StructuralVariant {
            id: "sv1".to_string(),
            sv_type,
            chromosome: "15".to_string(),
            start: 1000,
            end: 1000 + size,
            size,
            affected_genes: genes.iter().map(|g| g.to_string()).collect(),
            clinical_relevance: String::new(),
        }
    }

    fn cnv(copy_number: u32, cnv_type: CopyNumberType, size: u64, genes: &[&str]) -> CopyNumberVariant {
        CopyNumberVariant {
            id: "cnv1".to_string(),
            chromosome: "22".to_string(),
            start: 100,
            end: 100 + size,
            copy_number,
            cnv_type,
            affected_genes: genes.iter().map(|g| g.to_string()).collect(),
            clinical_relevance: String::new(),
        }
    }

    #[test]
    fn test_structural_relevance() {
        let dup = sv(StructuralVariantType::Duplication, 5_000, &["ube3a"]);
        assert!(structural_relevance(&dup).contains("alters dosage of ube3a"));

        let large = sv(StructuralVariantType::Inversion, 2_500_000, &["OR4F5"]);
        assert_eq!(structural_relevance(&large), "potentially pathogenic: large event (2.5 Mb)");

        let small = sv(StructuralVariantType::Insertion, 300, &[]);
        assert_eq!(structural_relevance(&small), UNCERTAIN);
    }

    #[test]
    fn test_haploinsufficient_loss_ranks_first() {
        let loss = cnv(1, CopyNumberType::Loss, 3_000_000, &["TBX1"]);
        assert!(copy_number_relevance(&loss).starts_with("likely pathogenic"));

        let gain = cnv(3, CopyNumberType::Gain, 3_000, &["TBX1"]);
        assert!(copy_number_relevance(&gain).starts_with("potentially pathogenic: copy number 3"));

        let benign = cnv(3, CopyNumberType::Gain, 3_000, &["OR4F5"]);
        assert_eq!(copy_number_relevance(&benign), UNCERTAIN);
    }

    #[test]
    fn test_annotate_keeps_inputs() {
        let input = vec![sv(StructuralVariantType::Deletion, 10, &["BRCA1"])];
        let annotated = annotate_structural(&input);
        assert_eq!(input[0].clinical_relevance, "");
        assert_eq!(annotated[0].id, input[0].id);
        assert!(!annotated[0].clinical_relevance.is_empty());
    }
}
