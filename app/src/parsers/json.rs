// ==============================================================================
// parsers/json.rs - Generic structured-object variant parser
// ==============================================================================
// Description: Parses {"format": "json"} variant objects
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use serde_json::Value;

use super::record::PartialVariant;
use super::{field, integer_field, number_field, parse_chromosome, string_field, RawInputError};
use crate::models::{Annotation, ClinicalSignificance, Zygosity};

const SECTION: &str = "variants";

/// Parse one generic variant object; field names may be camelCase or snake_case
pub fn parse_record(index: usize, record: &Value) -> Result<PartialVariant, RawInputError> {
    let obj = record.as_object().ok_or(RawInputError::InvalidField {
        section: SECTION,
        index,
        field: "variant",
        reason: "expected an object".to_string(),
    })?;

    let chromosome = string_field(obj, &["chromosome", "chrom", "chr"]).ok_or(
        RawInputError::MissingField {
            section: SECTION,
            index,
            field: "chromosome",
        },
    )?;
    let chromosome = parse_chromosome(&chromosome, SECTION, index)?;

    let position = integer_field(obj, &["position", "pos"], SECTION, index, "position")?
        .filter(|p| *p > 0)
        .ok_or(RawInputError::MissingField {
            section: SECTION,
            index,
            field: "position",
        })?;

    let reference = string_field(obj, &["reference", "ref", "refAllele", "ref_allele"]).ok_or(
        RawInputError::MissingField {
            section: SECTION,
            index,
            field: "reference",
        },
    )?;
    let alternate = string_field(obj, &["alternate", "alt", "altAllele", "alt_allele"]).ok_or(
        RawInputError::MissingField {
            section: SECTION,
            index,
            field: "alternate",
        },
    )?;

    let clinical_significance = match string_field(obj, &["clinicalSignificance", "clinical_significance"]) {
        Some(value) => Some(ClinicalSignificance::parse(&value).ok_or_else(|| {
            RawInputError::InvalidField {
                section: SECTION,
                index,
                field: "clinical_significance",
                reason: format!("unknown class '{}'", value),
            }
        })?),
        None => None,
    };

    let zygosity = match string_field(obj, &["zygosity"]) {
        Some(value) => Some(Zygosity::parse(&value).ok_or_else(|| RawInputError::InvalidField {
            section: SECTION,
            index,
            field: "zygosity",
            reason: format!("unknown zygosity '{}'", value),
        })?),
        None => None,
    };

    let annotations = match field(obj, &["annotations"]) {
        Some(value) => serde_json::from_value::<Vec<Annotation>>(value.clone()).map_err(|e| {
            RawInputError::InvalidField {
                section: SECTION,
                index,
                field: "annotations",
                reason: e.to_string(),
            }
        })?,
        None => Vec::new(),
    };

    let depth = integer_field(obj, &["depth", "dp"], SECTION, index, "depth")?
        .map(|d| d.min(u32::MAX as u64) as u32);

    Ok(PartialVariant {
        id: string_field(obj, &["id", "rsid", "variantId", "variant_id"]),
        chromosome,
        position,
        reference: reference.to_ascii_uppercase(),
        alternate: alternate.to_ascii_uppercase(),
        gene: string_field(obj, &["gene", "geneSymbol", "gene_symbol"]),
        transcript: string_field(obj, &["transcript", "transcriptId", "transcript_id"]),
        consequence: string_field(obj, &["consequence"]),
        clinical_significance,
        allele_frequency: number_field(
            obj,
            &["alleleFrequency", "allele_frequency", "af"],
            SECTION,
            index,
            "allele_frequency",
        )?,
        zygosity,
        depth,
        quality: number_field(obj, &["quality", "qual"], SECTION, index, "quality")?,
        genotype: string_field(obj, &["genotype", "gt"]),
        vaf: number_field(obj, &["vaf", "variantAlleleFraction"], SECTION, index, "vaf")?,
        allele_depths: None,
        annotations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_camel_case_record() {
        let record = json!({
            "id": "rs80357906",
            "chromosome": "chr17",
            "position": 43044295,
            "reference": "a",
            "alternate": "g",
            "geneSymbol": "BRCA1",
            "clinicalSignificance": "likely_pathogenic",
            "alleleFrequency": 0.0001,
            "zygosity": "heterozygous",
            "quality": "31.5",
            "depth": 48
        });

        let partial = parse_record(0, &record).unwrap();
        assert_eq!(partial.id.as_deref(), Some("rs80357906"));
        assert_eq!(partial.chromosome, "17");
        assert_eq!(partial.reference, "A");
        assert_eq!(partial.gene.as_deref(), Some("BRCA1"));
        assert_eq!(
            partial.clinical_significance,
            Some(ClinicalSignificance::LikelyPathogenic)
        );
        assert_eq!(partial.quality, Some(31.5));
        assert_eq!(partial.depth, Some(48));
    }

    #[test]
    fn test_rejects_unknown_significance() {
        let record = json!({
            "chromosome": "1", "position": 5, "reference": "A", "alternate": "T",
            "clinical_significance": "drug_response"
        });
        assert!(matches!(
            parse_record(3, &record),
            Err(RawInputError::InvalidField { index: 3, field: "clinical_significance", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_position() {
        let record = json!({"chromosome": "1", "position": 0, "reference": "A", "alternate": "T"});
        assert!(matches!(
            parse_record(0, &record),
            Err(RawInputError::MissingField { field: "position", .. })
        ));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(parse_record(0, &json!("1:100:A:T")).is_err());
    }
}
