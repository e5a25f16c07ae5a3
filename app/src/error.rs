// ==============================================================================
// error.rs - Analysis Error Taxonomy
// ==============================================================================
// Description: Error types shared by parsing, analysis and caching
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use thiserror::Error;

use crate::store::StoreError;

/// Sub-analyses launched by the analysis engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubAnalysisKind {
    Classification,
    Pharmacogenomics,
    StructuralVariants,
    CopyNumberVariants,
    QualityMetrics,
}

impl SubAnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubAnalysisKind::Classification => "classification",
            SubAnalysisKind::Pharmacogenomics => "pharmacogenomics",
            SubAnalysisKind::StructuralVariants => "structural_variants",
            SubAnalysisKind::CopyNumberVariants => "copy_number_variants",
            SubAnalysisKind::QualityMetrics => "quality_metrics",
        }
    }

    /// Required sub-analyses fail the whole run; optional ones degrade to empty
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            SubAnalysisKind::Classification | SubAnalysisKind::QualityMetrics
        )
    }
}

impl std::fmt::Display for SubAnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while configuring, parsing or running an analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Sub-analysis {kind} failed: {message}")]
    SubAnalysis {
        kind: SubAnalysisKind,
        message: String,
    },

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Annotation lookup failed: {0}")]
    Annotation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Caller errors are never retried
    pub fn is_caller_error(&self) -> bool {
        matches!(self, AnalysisError::MalformedInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_sub_analyses() {
        assert!(SubAnalysisKind::Classification.is_required());
        assert!(SubAnalysisKind::QualityMetrics.is_required());
        assert!(!SubAnalysisKind::Pharmacogenomics.is_required());
        assert!(!SubAnalysisKind::StructuralVariants.is_required());
        assert!(!SubAnalysisKind::CopyNumberVariants.is_required());
    }

    #[test]
    fn test_error_display() {
        let err = AnalysisError::SubAnalysis {
            kind: SubAnalysisKind::Pharmacogenomics,
            message: "knowledge base offline".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sub-analysis pharmacogenomics failed: knowledge base offline"
        );
        assert!(AnalysisError::MalformedInput("x".into()).is_caller_error());
        assert!(!AnalysisError::Analysis("x".into()).is_caller_error());
    }
}
