// ==============================================================================
// parsers/mod.rs - Raw input parsers
// ==============================================================================
// Description: Turn caller-supplied payloads into variant records
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Supported payload shapes:
// - {"format": "vcf",  "variants": [{"chrom", "pos", "ref", "alt", "info", "sample"}]}
// - {"format": "json", "variants": [{"chromosome", "position", "reference", "alternate"}]}
// Both may carry top-level "structural_variants" / "copy_number_variants" arrays.
// ==============================================================================

pub mod json;
pub mod record;
pub mod structural;
pub mod vcf;

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::annotation::AnnotationProvider;
use crate::error::AnalysisError;
use crate::models::{CopyNumberVariant, StructuralVariant, VariantRecord};

pub use record::PartialVariant;
pub use vcf::VcfEntry;

/// Raw input parsing errors
#[derive(Error, Debug, PartialEq)]
pub enum RawInputError {
    #[error("raw input must be a JSON object")]
    NotAnObject,

    #[error("raw input is missing the 'format' field")]
    MissingFormat,

    #[error("unsupported input format '{0}' (expected 'vcf' or 'json')")]
    UnsupportedFormat(String),

    #[error("raw input is missing the 'variants' array")]
    MissingVariants,

    #[error("{section} record {index}: missing required field '{field}'")]
    MissingField {
        section: &'static str,
        index: usize,
        field: &'static str,
    },

    #[error("{section} record {index}: invalid value for '{field}': {reason}")]
    InvalidField {
        section: &'static str,
        index: usize,
        field: &'static str,
        reason: String,
    },
}

impl From<RawInputError> for AnalysisError {
    fn from(err: RawInputError) -> Self {
        AnalysisError::MalformedInput(err.to_string())
    }
}

/// Supported raw input shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Vcf,
    Json,
}

impl InputFormat {
    /// Inspect the payload's "format" field and "variants" array
    pub fn detect(raw: &Value) -> Result<Self, RawInputError> {
        let obj = raw.as_object().ok_or(RawInputError::NotAnObject)?;

        let format = obj
            .get("format")
            .and_then(Value::as_str)
            .ok_or(RawInputError::MissingFormat)?;

        let format = match format.trim().to_ascii_lowercase().as_str() {
            "vcf" => InputFormat::Vcf,
            "json" => InputFormat::Json,
            _ => return Err(RawInputError::UnsupportedFormat(format.to_string())),
        };

        if !obj.get("variants").map(Value::is_array).unwrap_or(false) {
            return Err(RawInputError::MissingVariants);
        }

        Ok(format)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Vcf => "vcf",
            InputFormat::Json => "json",
        }
    }
}

/// Everything parsed out of one raw payload
#[derive(Debug, Clone, Default)]
pub struct ParsedInput {
    pub variants: Vec<VariantRecord>,
    pub structural_variants: Vec<StructuralVariant>,
    pub copy_number_variants: Vec<CopyNumberVariant>,
}

/// Parser for caller payloads, completing records via an annotation provider
pub struct RawInputParser {
    provider: Arc<dyn AnnotationProvider>,
}

impl RawInputParser {
    pub fn new(provider: Arc<dyn AnnotationProvider>) -> Self {
        Self { provider }
    }

    pub async fn parse(&self, raw: &Value) -> Result<ParsedInput, AnalysisError> {
        let format = InputFormat::detect(raw)?;
        let obj = raw.as_object().ok_or(RawInputError::NotAnObject)?;
        let records = obj
            .get("variants")
            .and_then(Value::as_array)
            .ok_or(RawInputError::MissingVariants)?;

        let mut parsed = ParsedInput::default();
        let mut partials = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            match format {
                InputFormat::Json => partials.push(json::parse_record(index, record)?),
                InputFormat::Vcf => match vcf::parse_record(index, record)? {
                    VcfEntry::Point(partial) => partials.push(partial),
                    VcfEntry::Structural(sv) => parsed.structural_variants.push(sv),
                    VcfEntry::CopyNumber(cnv) => parsed.copy_number_variants.push(cnv),
                },
            }
        }

        for (index, record) in section(obj, "structural_variants").iter().enumerate() {
            parsed
                .structural_variants
                .push(structural::parse_structural_variant(index, record)?);
        }
        for (index, record) in section(obj, "copy_number_variants").iter().enumerate() {
            parsed
                .copy_number_variants
                .push(structural::parse_copy_number_variant(index, record)?);
        }

        for partial in partials {
            let annotation = self.provider.annotate(&partial.locus()).await?;
            let variant = partial.complete(annotation);
            variant.validate()?;
            parsed.variants.push(variant);
        }

        debug!(
            "Parsed {} input: {} variants, {} structural, {} copy-number",
            format.as_str(),
            parsed.variants.len(),
            parsed.structural_variants.len(),
            parsed.copy_number_variants.len()
        );

        Ok(parsed)
    }
}

fn section<'a>(obj: &'a Map<String, Value>, name: &str) -> &'a [Value] {
    let camel = match name {
        "structural_variants" => "structuralVariants",
        "copy_number_variants" => "copyNumberVariants",
        other => other,
    };
    obj.get(name)
        .or_else(|| obj.get(camel))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// ==============================================================================
// FIELD HELPERS
// ==============================================================================

/// First present field among the aliases
pub(crate) fn field<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|value| !value.is_null())
}

pub(crate) fn string_field(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    match field(obj, aliases)? {
        Value::String(s) if !s.trim().is_empty() && s != "." => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric field, accepting numbers or numeric strings ("." means absent)
pub(crate) fn number_field(
    obj: &Map<String, Value>,
    aliases: &[&str],
    section: &'static str,
    index: usize,
    name: &'static str,
) -> Result<Option<f64>, RawInputError> {
    let value = match field(obj, aliases) {
        Some(value) => value,
        None => return Ok(None),
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim() == "." || s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(RawInputError::InvalidField {
            section,
            index,
            field: name,
            reason: format!("expected a number, got {}", value),
        }),
    }
}

/// Non-negative integer field
pub(crate) fn integer_field(
    obj: &Map<String, Value>,
    aliases: &[&str],
    section: &'static str,
    index: usize,
    name: &'static str,
) -> Result<Option<u64>, RawInputError> {
    match number_field(obj, aliases, section, index, name)? {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(Some(n as u64)),
        Some(n) => Err(RawInputError::InvalidField {
            section,
            index,
            field: name,
            reason: format!("expected a non-negative integer, got {}", n),
        }),
        None => Ok(None),
    }
}

/// Validate and normalize a chromosome name (1-22, X, Y, MT), dropping "chr"
pub(crate) fn parse_chromosome(
    raw: &str,
    section: &'static str,
    index: usize,
) -> Result<String, RawInputError> {
    let name = crate::annotation::normalize_chromosome(raw).to_ascii_uppercase();
    let valid = match name.as_str() {
        "X" | "Y" | "MT" => true,
        "M" => return Ok("MT".to_string()),
        other => other.parse::<u8>().map(|n| (1..=22).contains(&n)).unwrap_or(false),
    };

    if valid {
        Ok(name)
    } else {
        Err(RawInputError::InvalidField {
            section,
            index,
            field: "chromosome",
            reason: format!("unknown chromosome '{}'", raw),
        })
    }
}

pub(crate) fn gene_list(obj: &Map<String, Value>, aliases: &[&str]) -> Vec<String> {
    match field(obj, aliases) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(|c| c == ',' || c == '|' || c == '&')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
