// ==============================================================================
// models.rs - Genomic Analysis Data Models
// ==============================================================================
// Description: Variant records, findings and the aggregate analysis run
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Clinical significance classes (ACMG five-tier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalSignificance {
    Pathogenic,
    LikelyPathogenic,
    UncertainSignificance,
    LikelyBenign,
    Benign,
}

impl ClinicalSignificance {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalSignificance::Pathogenic => "pathogenic",
            ClinicalSignificance::LikelyPathogenic => "likely_pathogenic",
            ClinicalSignificance::UncertainSignificance => "uncertain_significance",
            ClinicalSignificance::LikelyBenign => "likely_benign",
            ClinicalSignificance::Benign => "benign",
        }
    }

    /// Parse from the snake_case name or the ClinVar-style spelling
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(&[' ', '-', '/'][..], "_");
        match normalized.as_str() {
            "pathogenic" => Some(ClinicalSignificance::Pathogenic),
            "likely_pathogenic" => Some(ClinicalSignificance::LikelyPathogenic),
            "uncertain_significance" | "vus" => Some(ClinicalSignificance::UncertainSignificance),
            "likely_benign" => Some(ClinicalSignificance::LikelyBenign),
            "benign" => Some(ClinicalSignificance::Benign),
            _ => None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            ClinicalSignificance::Pathogenic | ClinicalSignificance::LikelyPathogenic
        )
    }
}

/// Zygosity of a called variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zygosity {
    Homozygous,
    Heterozygous,
    Hemizygous,
}

impl Zygosity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "homozygous" | "hom" => Some(Zygosity::Homozygous),
            "heterozygous" | "het" => Some(Zygosity::Heterozygous),
            "hemizygous" | "hemi" => Some(Zygosity::Hemizygous),
            _ => None,
        }
    }

    /// Derive zygosity from a genotype string ("0/1", "1|1", "1")
    pub fn from_genotype(genotype: &str) -> Option<Self> {
        let alleles: Vec<&str> = genotype
            .split(|c| c == '|' || c == '/')
            .filter(|a| !a.is_empty())
            .collect();

        match alleles.as_slice() {
            [single] if *single != "." && *single != "0" => Some(Zygosity::Hemizygous),
            [a, b] if a == b && *a != "0" && *a != "." => Some(Zygosity::Homozygous),
            [a, b] if a != b && *a != "." && *b != "." => Some(Zygosity::Heterozygous),
            _ => None,
        }
    }
}

/// Evidence category of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationCategory {
    Pathogenicity,
    Population,
    Functional,
    Clinical,
}

/// Evidence attached to a single variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub source: String,
    pub category: AnnotationCategory,
    pub score: f64,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// One called genomic variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Stable identifier (rsID or "chrom:pos:ref:alt")
    pub id: String,

    pub chromosome: String,

    /// 1-based position
    pub position: u64,

    pub reference: String,
    pub alternate: String,
    pub gene: String,
    pub transcript: Option<String>,
    pub consequence: String,
    pub clinical_significance: ClinicalSignificance,

    /// Population allele frequency (0.0-1.0)
    pub allele_frequency: f64,

    pub zygosity: Zygosity,

    /// Sequencing depth (reads covering the locus)
    pub depth: u32,

    /// Phred-scaled call quality
    pub quality: f64,

    pub genotype: String,

    /// Variant allele fraction (0.0-1.0)
    pub vaf: f64,

    pub annotations: Vec<Annotation>,
}

impl VariantRecord {
    /// Check the numeric invariants of a parsed record
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.quality.is_finite() || self.quality < 0.0 {
            return Err(AnalysisError::MalformedInput(format!(
                "variant {} has invalid quality {}",
                self.id, self.quality
            )));
        }
        if !(0.0..=1.0).contains(&self.vaf) {
            return Err(AnalysisError::MalformedInput(format!(
                "variant {} has VAF {} outside [0, 1]",
                self.id, self.vaf
            )));
        }
        if !(0.0..=1.0).contains(&self.allele_frequency) {
            return Err(AnalysisError::MalformedInput(format!(
                "variant {} has allele frequency {} outside [0, 1]",
                self.id, self.allele_frequency
            )));
        }
        Ok(())
    }

    pub fn passes_quality(&self, threshold: f64) -> bool {
        self.quality >= threshold
    }

    /// Single-base substitution
    pub fn is_snv(&self) -> bool {
        self.reference.len() == 1 && self.alternate.len() == 1
    }
}

/// Drug response effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugEffect {
    IncreasedSensitivity,
    DecreasedSensitivity,
    NoEffect,
    Contraindicated,
}

/// Evidence level (A strongest, D weakest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvidenceLevel {
    A,
    B,
    C,
    D,
}

/// Pharmacogenomic finding for a drug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacogenomicFinding {
    pub gene: String,
    pub variant_id: Option<String>,
    pub drug: String,
    pub effect: DrugEffect,
    pub dosage_recommendation: String,
    pub evidence_level: EvidenceLevel,
    pub guidelines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralVariantType {
    Deletion,
    Duplication,
    Inversion,
    Insertion,
    Translocation,
}

impl StructuralVariantType {
    /// Parse a VCF SVTYPE value or the snake_case name
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEL" | "DELETION" => Some(StructuralVariantType::Deletion),
            "DUP" | "DUPLICATION" => Some(StructuralVariantType::Duplication),
            "INV" | "INVERSION" => Some(StructuralVariantType::Inversion),
            "INS" | "INSERTION" => Some(StructuralVariantType::Insertion),
            "BND" | "TRA" | "TRANSLOCATION" => Some(StructuralVariantType::Translocation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralVariant {
    pub id: String,
    pub sv_type: StructuralVariantType,
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub size: u64,
    pub affected_genes: Vec<String>,
    pub clinical_relevance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyNumberType {
    Gain,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyNumberVariant {
    pub id: String,
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub copy_number: u32,
    pub cnv_type: CopyNumberType,
    pub affected_genes: Vec<String>,
    pub clinical_relevance: String,
}

fn default_true() -> bool {
    true
}

fn default_quality_threshold() -> f64 {
    20.0
}

/// Options controlling which sub-analyses run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default = "default_true")]
    pub include_pharmacogenomics: bool,
    #[serde(default)]
    pub include_structural_variants: bool,
    #[serde(default)]
    pub include_copy_number_variants: bool,
    /// Minimum call quality for a variant to be analysed
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_pharmacogenomics: true,
            include_structural_variants: false,
            include_copy_number_variants: false,
            quality_threshold: default_quality_threshold(),
        }
    }
}

/// Sequencing quality summary over the filtered variant set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub mean_depth: f64,
    pub mean_quality: f64,
    pub pct_depth_10x: f64,
    pub pct_depth_20x: f64,
    pub pct_depth_30x: f64,
    pub ti_tv_ratio: f64,
    pub het_hom_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Variants passing the quality filter
    pub total_variants: usize,
    /// Variants removed by the quality filter
    pub filtered_variants: usize,
    pub pathogenic_variants: usize,
    pub likely_pathogenic_variants: usize,
    pub vus_variants: usize,
    pub likely_benign_variants: usize,
    pub benign_variants: usize,
    pub quality_metrics: QualityMetrics,
    pub processing_time_ms: u64,
}

/// Overall risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Map the highest per-disease risk score to a category
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            RiskLevel::VeryHigh
        } else if score > 0.6 {
            RiskLevel::High
        } else if score > 0.3 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRisk {
    pub disease: String,
    pub risk_score: f64,
    pub confidence: f64,
    pub contributing_variants: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    pub disease_risks: Vec<DiseaseRisk>,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            overall_risk: RiskLevel::Low,
            disease_risks: Vec::new(),
        }
    }
}

/// Complete result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub patient_id: String,
    pub variants: Vec<VariantRecord>,
    pub summary: AnalysisSummary,
    pub risk_assessment: RiskAssessment,
    pub pharmacogenomics: Vec<PharmacogenomicFinding>,
    pub structural_variants: Vec<StructuralVariant>,
    pub copy_number_variants: Vec<CopyNumberVariant>,
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clinical_significance_parse() {
        assert_eq!(
            ClinicalSignificance::parse("Likely pathogenic"),
            Some(ClinicalSignificance::LikelyPathogenic)
        );
        assert_eq!(
            ClinicalSignificance::parse("uncertain_significance"),
            Some(ClinicalSignificance::UncertainSignificance)
        );
        assert_eq!(
            ClinicalSignificance::parse("VUS"),
            Some(ClinicalSignificance::UncertainSignificance)
        );
        assert_eq!(ClinicalSignificance::parse("drug_response"), None);
    }

    #[test]
    fn test_zygosity_from_genotype() {
        assert_eq!(Zygosity::from_genotype("0/1"), Some(Zygosity::Heterozygous));
        assert_eq!(Zygosity::from_genotype("1|1"), Some(Zygosity::Homozygous));
        assert_eq!(Zygosity::from_genotype("1"), Some(Zygosity::Hemizygous));
        assert_eq!(Zygosity::from_genotype("0/0"), None);
        assert_eq!(Zygosity::from_genotype("./."), None);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.3), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.31), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(0.6), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(0.61), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.81), RiskLevel::VeryHigh);
    }

    #[test]
    fn test_risk_level_monotonic() {
        let mut previous = RiskLevel::Low;
        for step in 0..=100 {
            let level = RiskLevel::from_score(step as f64 / 100.0);
            assert!(level >= previous, "risk decreased at score {}", step);
            previous = level;
        }
    }

    #[test]
    fn test_analysis_options_defaults() {
        let options: AnalysisOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, AnalysisOptions::default());
        assert!(options.include_pharmacogenomics);
        assert!(!options.include_structural_variants);
        assert_eq!(options.quality_threshold, 20.0);
    }

    #[test]
    fn test_evidence_level_ordering() {
        assert!(EvidenceLevel::A < EvidenceLevel::B);
        assert!(EvidenceLevel::C < EvidenceLevel::D);
    }
}
