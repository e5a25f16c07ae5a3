// ==============================================================================
// analysis/pharmacogenomics.rs - Pharmacogenomic lookup
// ==============================================================================
// Description: Drug-response findings for variants in known pharmacogenes
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// References:
// - CPIC guidelines: https://cpicpgx.org/guidelines/
// - DPWG guidelines: https://www.pharmgkb.org/page/dpwg
// ==============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use crate::error::AnalysisError;
use crate::models::{DrugEffect, EvidenceLevel, PharmacogenomicFinding, VariantRecord, Zygosity};

/// Genes looked up by the pharmacogenomics sub-analysis
pub const PHARMACOGENES: &[&str] = &[
    "CYP2D6", "CYP2C19", "CYP2C9", "VKORC1", "TPMT", "DPYD", "SLCO1B1", "UGT1A1", "HLA-B",
];

pub fn is_pharmacogene(gene: &str) -> bool {
    PHARMACOGENES.iter().any(|g| g.eq_ignore_ascii_case(gene))
}

/// Drug-response knowledge consulted per pharmacogene variant
#[async_trait]
pub trait PharmacogenomicKnowledgeBase: Send + Sync {
    async fn findings_for(&self, variant: &VariantRecord) -> Result<Vec<PharmacogenomicFinding>, AnalysisError>;
}

/// Run the lookup for every variant in a pharmacogene
pub async fn analyze<'a, I>(
    knowledge_base: &dyn PharmacogenomicKnowledgeBase,
    variants: I,
) -> Result<Vec<PharmacogenomicFinding>, AnalysisError>
where
    I: IntoIterator<Item = &'a VariantRecord>,
{
    let mut findings = Vec::new();
    for variant in variants.into_iter().filter(|v| is_pharmacogene(&v.gene)) {
        let found = knowledge_base.findings_for(variant).await?;
        debug!("{} findings for {} ({})", found.len(), variant.id, variant.gene);
        findings.extend(found);
    }
    Ok(findings)
}

struct DrugRule {
    drug: &'static str,
    carrier_effect: DrugEffect,
    carrier_recommendation: &'static str,
    homozygous_effect: DrugEffect,
    homozygous_recommendation: &'static str,
    evidence_level: EvidenceLevel,
    guidelines: &'static [&'static str],
}

/// Built-in table of well-established gene-drug pairs
pub struct StaticPharmacogenomicKnowledgeBase {
    rules: HashMap<&'static str, Vec<DrugRule>>,
}

impl Default for StaticPharmacogenomicKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPharmacogenomicKnowledgeBase {
    pub fn new() -> Self {
        let mut rules: HashMap<&'static str, Vec<DrugRule>> = HashMap::new();

        rules.insert("CYP2D6", vec![DrugRule {
            drug: "codeine",
            carrier_effect: DrugEffect::DecreasedSensitivity,
            carrier_recommendation: "Use label-recommended dosing; monitor for reduced analgesia",
            homozygous_effect: DrugEffect::Contraindicated,
            homozygous_recommendation: "Avoid codeine; use a non-tramadol alternative analgesic",
            evidence_level: EvidenceLevel::A,
            guidelines: &["CPIC", "DPWG"],
        }]);
        rules.insert("CYP2C19", vec![DrugRule {
            drug: "clopidogrel",
            carrier_effect: DrugEffect::DecreasedSensitivity,
            carrier_recommendation: "Consider prasugrel or ticagrelor if no contraindication",
            homozygous_effect: DrugEffect::Contraindicated,
            homozygous_recommendation: "Avoid clopidogrel; use prasugrel or ticagrelor",
            evidence_level: EvidenceLevel::A,
            guidelines: &["CPIC", "DPWG"],
        }]);
        rules.insert("CYP2C9", vec![DrugRule {
            drug: "warfarin",
            carrier_effect: DrugEffect::IncreasedSensitivity,
            carrier_recommendation: "Reduce starting dose by 25-30%",
            homozygous_effect: DrugEffect::IncreasedSensitivity,
            homozygous_recommendation: "Reduce starting dose by 50-80%",
            evidence_level: EvidenceLevel::A,
            guidelines: &["CPIC"],
        }]);
        rules.insert("VKORC1", vec![DrugRule {
            drug: "warfarin",
            carrier_effect: DrugEffect::IncreasedSensitivity,
            carrier_recommendation: "Reduce starting dose by 25%",
            homozygous_effect: DrugEffect::IncreasedSensitivity,
            homozygous_recommendation: "Reduce starting dose by 50%",
            evidence_level: EvidenceLevel::A,
            guidelines: &["CPIC"],
        }]);
        rules.insert("TPMT", vec![DrugRule {
            drug: "azathioprine",
            carrier_effect: DrugEffect::IncreasedSensitivity,
            carrier_recommendation: "Start at 30-80% of the normal dose",
            homozygous_effect: DrugEffect::Contraindicated,
            homozygous_recommendation: "Use an alternative agent or reduce dose tenfold, three times weekly",
            evidence_level: EvidenceLevel::A,
            guidelines: &["CPIC", "DPWG"],
        }]);
        rules.insert("DPYD", vec![DrugRule {
            drug: "fluorouracil",
            carrier_effect: DrugEffect::IncreasedSensitivity,
            carrier_recommendation: "Reduce starting dose by 50% and titrate on toxicity",
            homozygous_effect: DrugEffect::Contraindicated,
            homozygous_recommendation: "Avoid fluoropyrimidines",
            evidence_level: EvidenceLevel::A,
            guidelines: &["CPIC", "DPWG"],
        }]);
        rules.insert("SLCO1B1", vec![DrugRule {
            drug: "simvastatin",
            carrier_effect: DrugEffect::IncreasedSensitivity,
            carrier_recommendation: "Prescribe a lower dose or an alternative statin",
            homozygous_effect: DrugEffect::IncreasedSensitivity,
            homozygous_recommendation: "Prescribe an alternative statin",
            evidence_level: EvidenceLevel::A,
            guidelines: &["CPIC"],
        }]);
        rules.insert("UGT1A1", vec![DrugRule {
            drug: "irinotecan",
            carrier_effect: DrugEffect::NoEffect,
            carrier_recommendation: "Use standard dosing",
            homozygous_effect: DrugEffect::IncreasedSensitivity,
            homozygous_recommendation: "Reduce starting dose by at least 30%",
            evidence_level: EvidenceLevel::B,
            guidelines: &["DPWG"],
        }]);
        rules.insert("HLA-B", vec![
            DrugRule {
                drug: "abacavir",
                carrier_effect: DrugEffect::Contraindicated,
                carrier_recommendation: "Do not prescribe abacavir",
                homozygous_effect: DrugEffect::Contraindicated,
                homozygous_recommendation: "Do not prescribe abacavir",
                evidence_level: EvidenceLevel::A,
                guidelines: &["CPIC", "DPWG"],
            },
            DrugRule {
                drug: "carbamazepine",
                carrier_effect: DrugEffect::Contraindicated,
                carrier_recommendation: "Avoid carbamazepine in carbamazepine-naive patients",
                homozygous_effect: DrugEffect::Contraindicated,
                homozygous_recommendation: "Avoid carbamazepine in carbamazepine-naive patients",
                evidence_level: EvidenceLevel::B,
                guidelines: &["CPIC"],
            },
        ]);

        Self { rules }
    }
}

#[async_trait]
impl PharmacogenomicKnowledgeBase for StaticPharmacogenomicKnowledgeBase {
    async fn findings_for(&self, variant: &VariantRecord) -> Result<Vec<PharmacogenomicFinding>, AnalysisError> {
        let gene = variant.gene.to_ascii_uppercase();
        let rules = match self.rules.get(gene.as_str()) {
            Some(rules) => rules,
            None => return Ok(Vec::new()),
        };

        // Hemizygous carriers have no reference copy left
        let both_copies = matches!(variant.zygosity, Zygosity::Homozygous | Zygosity::Hemizygous);

        Ok(rules
            .iter()
            .map(|rule| {
                let (effect, recommendation) = if both_copies {
                    (rule.homozygous_effect, rule.homozygous_recommendation)
                } else {
                    (rule.carrier_effect, rule.carrier_recommendation)
                };
                PharmacogenomicFinding {
                    gene: gene.clone(),
                    variant_id: Some(variant.id.clone()),
                    drug: rule.drug.to_string(),
                    effect,
                    dosage_recommendation: recommendation.to_string(),
                    evidence_level: rule.evidence_level,
                    guidelines: rule.guidelines.iter().map(|g| g.to_string()).collect(),
                }
            })
            .collect())
    }
}
