// ==============================================================================
// annotation.rs - Variant Annotation Provider
// ==============================================================================
// Description: Injected annotation lookup used to complete parsed variants
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::AnalysisError;
use crate::models::{Annotation, ClinicalSignificance};

/// Genomic coordinates identifying a variant for lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantLocus {
    pub chromosome: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
}

impl VariantLocus {
    /// Lookup key: "chrom:pos:ref:alt" with any "chr" prefix removed
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            normalize_chromosome(&self.chromosome),
            self.position,
            self.reference.to_ascii_uppercase(),
            self.alternate.to_ascii_uppercase()
        )
    }
}

pub fn normalize_chromosome(chromosome: &str) -> &str {
    let trimmed = chromosome.trim();
    trimmed
        .strip_prefix("chr")
        .or_else(|| trimmed.strip_prefix("CHR"))
        .unwrap_or(trimmed)
}

/// Knowledge about a variant returned by an annotation source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantAnnotation {
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub consequence: Option<String>,
    #[serde(default)]
    pub clinical_significance: Option<ClinicalSignificance>,
    #[serde(default)]
    pub population_frequency: Option<f64>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// External variant-annotation service
#[async_trait]
pub trait AnnotationProvider: Send + Sync {
    async fn annotate(&self, locus: &VariantLocus) -> Result<Option<VariantAnnotation>, AnalysisError>;
}

/// Annotation table held in memory, keyed by "chrom:pos:ref:alt"
#[derive(Debug, Default, Clone)]
pub struct AnnotationTable {
    entries: HashMap<String, VariantAnnotation>,
}

impl AnnotationTable {
    /// Table with no knowledge; every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, locus: VariantLocus, annotation: VariantAnnotation) -> Self {
        self.entries.insert(locus.key(), annotation);
        self
    }

    /// Load a JSON object mapping "chrom:pos:ref:alt" to annotations
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Configuration(format!(
                "Failed to read annotation table {:?}: {}",
                path, e
            ))
        })?;

        let raw: HashMap<String, VariantAnnotation> = serde_json::from_str(&contents)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, annotation) in raw {
            let locus = parse_locus_key(&key).ok_or_else(|| {
                AnalysisError::Configuration(format!("Invalid annotation key '{}'", key))
            })?;
            entries.insert(locus.key(), annotation);
        }

        info!("Loaded {} annotation entries from {:?}", entries.len(), path);
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AnnotationProvider for AnnotationTable {
    async fn annotate(&self, locus: &VariantLocus) -> Result<Option<VariantAnnotation>, AnalysisError> {
        Ok(self.entries.get(&locus.key()).cloned())
    }
}

fn parse_locus_key(key: &str) -> Option<VariantLocus> {
    let parts: Vec<&str> = key.split(':').collect();
    if parts.len() != 4 {
        return None;
    }
    Some(VariantLocus {
        chromosome: parts[0].to_string(),
        position: parts[1].parse().ok()?,
        reference: parts[2].to_string(),
        alternate: parts[3].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn locus(chrom: &str, pos: u64) -> VariantLocus {
        VariantLocus {
            chromosome: chrom.to_string(),
            position: pos,
            reference: "a".to_string(),
            alternate: "G".to_string(),
        }
    }

    #[test]
    fn test_locus_key_normalizes() {
        assert_eq!(locus("chr17", 43044295).key(), "17:43044295:A:G");
        assert_eq!(locus("17", 43044295).key(), "17:43044295:A:G");
    }

    #[tokio::test]
    async fn test_table_lookup() {
        let table = AnnotationTable::empty().with_entry(
            locus("17", 43044295),
            VariantAnnotation {
                gene: Some("BRCA1".to_string()),
                ..Default::default()
            },
        );

        let hit = table.annotate(&locus("chr17", 43044295)).await.unwrap();
        assert_eq!(hit.unwrap().gene.as_deref(), Some("BRCA1"));
        assert!(table.annotate(&locus("17", 1)).await.unwrap().is_none());
    }

    #[test]
    fn test_table_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"chr7:117559590:G:A": {{"gene": "CFTR", "clinical_significance": "pathogenic"}}}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let table = AnnotationTable::from_path(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.entries.get("7:117559590:G:A").and_then(|a| a.clinical_significance),
            Some(ClinicalSignificance::Pathogenic)
        );
    }

    #[test]
    fn test_table_rejects_bad_key() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"chr7-117559590": {{}}}}"#).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            AnnotationTable::from_path(file.path()),
            Err(AnalysisError::Configuration(_))
        ));
    }
}
