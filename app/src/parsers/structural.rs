// ==============================================================================
// parsers/structural.rs - Structural and copy-number variant parser
// ==============================================================================
// Description: Parses top-level structural_variants / copy_number_variants
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use serde_json::Value;

use super::{gene_list, integer_field, parse_chromosome, string_field, RawInputError};
use crate::models::{CopyNumberType, CopyNumberVariant, StructuralVariant, StructuralVariantType};

const SV_SECTION: &str = "structural_variants";
const CNV_SECTION: &str = "copy_number_variants";

/// Relevance text before the structural sub-analysis has run
pub(crate) fn relevance_placeholder() -> String {
    "not assessed".to_string()
}

/// Diploid baseline: fewer copies is a loss, more is a gain
pub(crate) fn cnv_type_for(copy_number: u32) -> Option<CopyNumberType> {
    match copy_number {
        0 | 1 => Some(CopyNumberType::Loss),
        2 => None,
        _ => Some(CopyNumberType::Gain),
    }
}

pub fn parse_structural_variant(index: usize, record: &Value) -> Result<StructuralVariant, RawInputError> {
    let obj = record.as_object().ok_or(RawInputError::InvalidField {
        section: SV_SECTION,
        index,
        field: "record",
        reason: "expected an object".to_string(),
    })?;

    let chromosome = string_field(obj, &["chromosome", "chrom"]).ok_or(RawInputError::MissingField {
        section: SV_SECTION,
        index,
        field: "chromosome",
    })?;
    let chromosome = parse_chromosome(&chromosome, SV_SECTION, index)?;

    let raw_type = string_field(obj, &["type", "svType", "sv_type"]).ok_or(RawInputError::MissingField {
        section: SV_SECTION,
        index,
        field: "type",
    })?;
    let sv_type = StructuralVariantType::parse(&raw_type).ok_or(RawInputError::InvalidField {
        section: SV_SECTION,
        index,
        field: "type",
        reason: format!("unknown SV type '{}'", raw_type),
    })?;

    let start = integer_field(obj, &["start", "position", "breakpoint1"], SV_SECTION, index, "start")?
        .ok_or(RawInputError::MissingField {
            section: SV_SECTION,
            index,
            field: "start",
        })?;
    let declared_size = integer_field(obj, &["size", "length"], SV_SECTION, index, "size")?;
    let end = match integer_field(obj, &["end", "breakpoint2"], SV_SECTION, index, "end")? {
        Some(end) => end,
        None => start
            .checked_add(declared_size.unwrap_or(0))
            .ok_or_else(|| RawInputError::InvalidField {
                section: SV_SECTION,
                index,
                field: "size",
                reason: format!("start {} plus size overflows", start),
            })?,
    };

    if end < start {
        return Err(RawInputError::InvalidField {
            section: SV_SECTION,
            index,
            field: "end",
            reason: format!("end {} precedes start {}", end, start),
        });
    }

    Ok(StructuralVariant {
        id: string_field(obj, &["id"])
            .unwrap_or_else(|| format!("{}:{}-{}:{:?}", chromosome, start, end, sv_type).to_lowercase()),
        sv_type,
        chromosome,
        start,
        end,
        size: declared_size.unwrap_or(end - start),
        affected_genes: gene_list(obj, &["affectedGenes", "affected_genes", "genes"]),
        clinical_relevance: relevance_placeholder(),
    })
}

pub fn parse_copy_number_variant(index: usize, record: &Value) -> Result<CopyNumberVariant, RawInputError> {
    let obj = record.as_object().ok_or(RawInputError::InvalidField {
        section: CNV_SECTION,
        index,
        field: "record",
        reason: "expected an object".to_string(),
    })?;

    let chromosome = string_field(obj, &["chromosome", "chrom"]).ok_or(RawInputError::MissingField {
        section: CNV_SECTION,
        index,
        field: "chromosome",
    })?;
    let chromosome = parse_chromosome(&chromosome, CNV_SECTION, index)?;

    let start = integer_field(obj, &["start"], CNV_SECTION, index, "start")?.ok_or(
        RawInputError::MissingField {
            section: CNV_SECTION,
            index,
            field: "start",
        },
    )?;
    let end = integer_field(obj, &["end"], CNV_SECTION, index, "end")?.ok_or(
        RawInputError::MissingField {
            section: CNV_SECTION,
            index,
            field: "end",
        },
    )?;
    if end < start {
        return Err(RawInputError::InvalidField {
            section: CNV_SECTION,
            index,
            field: "end",
            reason: format!("end {} precedes start {}", end, start),
        });
    }

    let copy_number = integer_field(obj, &["copyNumber", "copy_number", "cn"], CNV_SECTION, index, "copy_number")?
        .ok_or(RawInputError::MissingField {
            section: CNV_SECTION,
            index,
            field: "copy_number",
        })?
        .min(u32::MAX as u64) as u32;

    let cnv_type = cnv_type_for(copy_number).ok_or(RawInputError::InvalidField {
        section: CNV_SECTION,
        index,
        field: "copy_number",
        reason: "copy number 2 is not a copy-number variant".to_string(),
    })?;

    Ok(CopyNumberVariant {
        id: string_field(obj, &["id"])
            .unwrap_or_else(|| format!("{}:{}-{}:cn{}", chromosome, start, end, copy_number)),
        chromosome,
        start,
        end,
        copy_number,
        cnv_type,
        affected_genes: gene_list(obj, &["affectedGenes", "affected_genes", "genes"]),
        clinical_relevance: relevance_placeholder(),
    })
}
