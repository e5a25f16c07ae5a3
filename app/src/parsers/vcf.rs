// ==============================================================================
// parsers/vcf.rs - VCF-shaped record parser
// ==============================================================================
// Description: Parses {"format": "vcf"} records carrying VCF column names
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// References:
// - VCF 4.3 Spec: https://samtools.github.io/hts-specs/VCFv4.3.pdf
// ==============================================================================
// Record shape:
//   {"chrom": "17", "pos": 43044295, "id": "rs80357906", "ref": "A", "alt": "G",
//    "qual": 50, "info": {"GENE": "BRCA1", "CLNSIG": "Pathogenic", "AF": 0.0001},
//    "sample": {"GT": "0/1", "DP": 35, "AD": [18, 17]}}
// Records whose INFO carries SVTYPE are structural or copy-number calls.
// ==============================================================================

use serde_json::{Map, Value};
use tracing::debug;

use super::record::PartialVariant;
use super::structural::{cnv_type_for, relevance_placeholder};
use super::{
    field, gene_list, integer_field, number_field, parse_chromosome, string_field, RawInputError,
};
use crate::models::{
    ClinicalSignificance, CopyNumberVariant, StructuralVariant, StructuralVariantType,
};

const SECTION: &str = "variants";

/// One parsed VCF-shaped record
#[derive(Debug, Clone)]
pub enum VcfEntry {
    Point(PartialVariant),
    Structural(StructuralVariant),
    CopyNumber(CopyNumberVariant),
}

pub fn parse_record(index: usize, record: &Value) -> Result<VcfEntry, RawInputError> {
    let obj = record.as_object().ok_or(RawInputError::InvalidField {
        section: SECTION,
        index,
        field: "record",
        reason: "expected an object".to_string(),
    })?;

    let empty = Map::new();
    let info = field(obj, &["info", "INFO"])
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let sample = field(obj, &["sample", "SAMPLE", "format", "FORMAT"])
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let chromosome = string_field(obj, &["chrom", "CHROM", "#CHROM", "chromosome"]).ok_or(
        RawInputError::MissingField {
            section: SECTION,
            index,
            field: "chromosome",
        },
    )?;
    let chromosome = parse_chromosome(&chromosome, SECTION, index)?;

    let position = integer_field(obj, &["pos", "POS", "position"], SECTION, index, "position")?
        .filter(|p| *p > 0)
        .ok_or(RawInputError::MissingField {
            section: SECTION,
            index,
            field: "position",
        })?;

    let id = string_field(obj, &["id", "ID"]);

    if let Some(sv_type) = string_field(info, &["SVTYPE"]) {
        return parse_sv_record(index, id, chromosome, position, &sv_type, info);
    }

    let reference = string_field(obj, &["ref", "REF", "reference"]).ok_or(
        RawInputError::MissingField {
            section: SECTION,
            index,
            field: "reference",
        },
    )?;
    let alternate = first_alternate(obj).ok_or(RawInputError::MissingField {
        section: SECTION,
        index,
        field: "alternate",
    })?;

    let clinical_significance = string_field(info, &["CLNSIG"])
        .and_then(|value| ClinicalSignificance::parse(&value));

    let depth = integer_field(sample, &["DP"], SECTION, index, "DP")?
        .or(integer_field(info, &["DP"], SECTION, index, "DP")?)
        .map(|d| d.min(u32::MAX as u64) as u32);

    Ok(VcfEntry::Point(PartialVariant {
        id,
        chromosome,
        position,
        reference: reference.to_ascii_uppercase(),
        alternate: alternate.to_ascii_uppercase(),
        gene: string_field(info, &["GENE", "GENEINFO"]).map(|g| strip_gene_id(&g)),
        transcript: string_field(info, &["TRANSCRIPT", "FEATURE"]),
        consequence: string_field(info, &["CSQ", "CONSEQUENCE", "MC"]),
        clinical_significance,
        allele_frequency: number_field(info, &["AF", "gnomAD_AF"], SECTION, index, "AF")?,
        zygosity: None,
        depth,
        quality: number_field(obj, &["qual", "QUAL", "quality"], SECTION, index, "quality")?,
        genotype: string_field(sample, &["GT"]),
        vaf: number_field(sample, &["VAF", "AF"], SECTION, index, "VAF")?,
        allele_depths: allele_depths(sample),
        annotations: Vec::new(),
    }))
}

fn parse_sv_record(
    index: usize,
    id: Option<String>,
    chromosome: String,
    start: u64,
    sv_type: &str,
    info: &Map<String, Value>,
) -> Result<VcfEntry, RawInputError> {
    let end = integer_field(info, &["END"], SECTION, index, "END")?;
    let declared_len = number_field(info, &["SVLEN"], SECTION, index, "SVLEN")?
        .map(|len| len.abs() as u64);
    let end = match end {
        Some(end) => end,
        None => start
            .checked_add(declared_len.unwrap_or(0))
            .ok_or_else(|| RawInputError::InvalidField {
                section: SECTION,
                index,
                field: "SVLEN",
                reason: format!("POS {} plus SVLEN overflows", start),
            })?,
    };
    let size = declared_len.unwrap_or_else(|| end.saturating_sub(start));
    let affected_genes = gene_list(info, &["GENES", "GENE"]);
    let id = id.unwrap_or_else(|| format!("{}:{}-{}:{}", chromosome, start, end, sv_type));

    if sv_type.eq_ignore_ascii_case("CNV") {
        let copy_number = integer_field(info, &["CN"], SECTION, index, "CN")?.ok_or(
            RawInputError::MissingField {
                section: SECTION,
                index,
                field: "CN",
            },
        )? as u32;

        let cnv_type = cnv_type_for(copy_number).ok_or(RawInputError::InvalidField {
            section: SECTION,
            index,
            field: "CN",
            reason: "copy number 2 is not a copy-number variant".to_string(),
        })?;

        return Ok(VcfEntry::CopyNumber(CopyNumberVariant {
            id,
            chromosome,
            start,
            end,
            copy_number,
            cnv_type,
            affected_genes,
            clinical_relevance: relevance_placeholder(),
        }));
    }

    let parsed_type = StructuralVariantType::parse(sv_type).ok_or(RawInputError::InvalidField {
        section: SECTION,
        index,
        field: "SVTYPE",
        reason: format!("unknown SV type '{}'", sv_type),
    })?;

    debug!("Record {} is a {:?} structural call", index, parsed_type);

    Ok(VcfEntry::Structural(StructuralVariant {
        id,
        sv_type: parsed_type,
        chromosome,
        start,
        end,
        size,
        affected_genes,
        clinical_relevance: relevance_placeholder(),
    }))
}

/// ALT may be a string ("G" or "G,T") or an array; the first allele is used
fn first_alternate(obj: &Map<String, Value>) -> Option<String> {
    match field(obj, &["alt", "ALT", "alternate"])? {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .find(|a| !a.is_empty() && *a != ".")
            .map(str::to_string),
        Value::Array(alleles) => alleles
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|a| !a.is_empty() && *a != ".")
            .map(str::to_string),
        _ => None,
    }
}

/// AD as [ref, alt] array or "ref,alt" string
fn allele_depths(sample: &Map<String, Value>) -> Option<(u32, u32)> {
    let depths: Vec<u32> = match field(sample, &["AD"])? {
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_u64)
            .map(|d| d.min(u32::MAX as u64) as u32)
            .collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|d| d.trim().parse::<u32>().ok())
            .collect(),
        _ => return None,
    };

    match depths.as_slice() {
        [ref_depth, alt_depth, ..] => Some((*ref_depth, *alt_depth)),
        _ => None,
    }
}

/// GENEINFO is "SYMBOL:ID|SYMBOL:ID"; keep the first symbol
fn strip_gene_id(value: &str) -> String {
    value
        .split('|')
        .next()
        .and_then(|g| g.split(':').next())
        .unwrap_or(value)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CopyNumberType;
    use serde_json::json;

    #[test]
    fn test_parse_point_record() {
        let record = json!({
            "chrom": "chr17", "pos": 43044295, "id": "rs80357906", "ref": "A", "alt": "G,T",
            "qual": 50,
            "info": {"GENEINFO": "BRCA1:672", "CLNSIG": "Pathogenic", "AF": 0.0001},
            "sample": {"GT": "0/1", "DP": 35, "AD": [18, 17]}
        });

        match parse_record(0, &record).unwrap() {
            VcfEntry::Point(p) => {
                assert_eq!(p.chromosome, "17");
                assert_eq!(p.alternate, "G");
                assert_eq!(p.gene.as_deref(), Some("BRCA1"));
                assert_eq!(p.clinical_significance, Some(ClinicalSignificance::Pathogenic));
                assert_eq!(p.quality, Some(50.0));
                assert_eq!(p.depth, Some(35));
                assert_eq!(p.allele_depths, Some((18, 17)));
                assert_eq!(p.genotype.as_deref(), Some("0/1"));
            }
            other => panic!("expected point record, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_qual_is_absent() {
        let record = json!({"CHROM": "1", "POS": 10, "REF": "C", "ALT": ["T"], "QUAL": "."});
        match parse_record(0, &record).unwrap() {
            VcfEntry::Point(p) => assert_eq!(p.quality, None),
            other => panic!("expected point record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_structural_record() {
        let record = json!({
            "chrom": "17", "pos": 43000000, "ref": "N", "alt": "<DEL>",
            "info": {"SVTYPE": "DEL", "END": 43125000, "GENES": "BRCA1,NBR2"}
        });

        match parse_record(0, &record).unwrap() {
            VcfEntry::Structural(sv) => {
                assert_eq!(sv.sv_type, StructuralVariantType::Deletion);
                assert_eq!(sv.size, 125000);
                assert_eq!(sv.affected_genes, vec!["BRCA1".to_string(), "NBR2".to_string()]);
            }
            other => panic!("expected structural record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_cnv_record() {
        let record = json!({
            "chrom": "22", "pos": 19000000,
            "info": {"SVTYPE": "CNV", "END": 21500000, "CN": 1, "GENES": ["TBX1"]}
        });

        match parse_record(0, &record).unwrap() {
            VcfEntry::CopyNumber(cnv) => {
                assert_eq!(cnv.cnv_type, CopyNumberType::Loss);
                assert_eq!(cnv.copy_number, 1);
                assert_eq!(cnv.end, 21500000);
            }
            other => panic!("expected copy-number record, got {:?}", other),
        }
    }

    #[test]
    fn test_cnv_requires_copy_number() {
        let record = json!({"chrom": "22", "pos": 100, "info": {"SVTYPE": "CNV", "END": 500}});
        assert!(matches!(
            parse_record(4, &record),
            Err(RawInputError::MissingField { index: 4, field: "CN", .. })
        ));
    }

    #[test]
    fn test_sv_length_overflow_is_invalid() {
        let record = json!({"chrom": "1", "pos": u64::MAX - 1, "info": {"SVTYPE": "DUP", "SVLEN": 100}});
        assert!(matches!(
            parse_record(1, &record),
            Err(RawInputError::InvalidField { index: 1, field: "SVLEN", .. })
        ));
    }

    #[test]
    fn test_unknown_sv_type() {
        let record = json!({"chrom": "1", "pos": 100, "info": {"SVTYPE": "XYZ"}});
        assert!(parse_record(0, &record).is_err());
    }
}
