// ==============================================================================
// analysis/risk.rs - Disease risk assessment
// ==============================================================================
// Description: Groups actionable variants by disease and scores each group
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Scoring:
//   weight(pathogenic) = 0.9, weight(likely_pathogenic) = 0.7
//   risk_score = min(1 - prod(1 - weight), 0.99)
//   confidence = mean(min(quality / 60, 1)), x0.75 if any contributor is likely_pathogenic
//   overall    = RiskLevel::from_score(max risk_score), low when nothing contributes
// ==============================================================================

use std::collections::BTreeMap;

use crate::models::{ClinicalSignificance, DiseaseRisk, RiskAssessment, RiskLevel, VariantRecord};

const PATHOGENIC_WEIGHT: f64 = 0.9;
const LIKELY_PATHOGENIC_WEIGHT: f64 = 0.7;
const MAX_RISK_SCORE: f64 = 0.99;
const FULL_CONFIDENCE_QUALITY: f64 = 60.0;
const LIKELY_PATHOGENIC_CONFIDENCE: f64 = 0.75;

struct DiseaseEntry {
    disease: &'static str,
    genes: &'static [&'static str],
    recommendations: &'static [&'static str],
}

const DISEASE_TABLE: &[DiseaseEntry] = &[
    DiseaseEntry {
        disease: "Hereditary breast and ovarian cancer",
        genes: &["BRCA1", "BRCA2", "PALB2"],
        recommendations: &[
            "Refer for genetic counselling",
            "Begin enhanced breast screening with annual MRI",
            "Discuss risk-reducing surgical options",
        ],
    },
    DiseaseEntry {
        disease: "Lynch syndrome",
        genes: &["MLH1", "MSH2", "MSH6", "PMS2", "EPCAM"],
        recommendations: &[
            "Refer for genetic counselling",
            "Colonoscopy every 1-2 years from age 25",
        ],
    },
    DiseaseEntry {
        disease: "Li-Fraumeni syndrome",
        genes: &["TP53"],
        recommendations: &[
            "Refer for genetic counselling",
            "Annual whole-body MRI surveillance",
        ],
    },
    DiseaseEntry {
        disease: "Familial adenomatous polyposis",
        genes: &["APC"],
        recommendations: &["Annual colonoscopy from age 10-12"],
    },
    DiseaseEntry {
        disease: "Familial hypercholesterolemia",
        genes: &["LDLR", "APOB", "PCSK9"],
        recommendations: &[
            "Measure fasting lipid panel",
            "Start lipid-lowering therapy per guidelines",
            "Offer cascade testing to first-degree relatives",
        ],
    },
    DiseaseEntry {
        disease: "Hypertrophic cardiomyopathy",
        genes: &["MYBPC3", "MYH7", "TNNT2"],
        recommendations: &["Echocardiogram and ECG", "Cardiology referral"],
    },
    DiseaseEntry {
        disease: "Cystic fibrosis",
        genes: &["CFTR"],
        recommendations: &["Carrier status counselling", "Offer partner testing"],
    },
    DiseaseEntry {
        disease: "Hemoglobinopathy",
        genes: &["HBB", "HBA1", "HBA2"],
        recommendations: &["Complete blood count with hemoglobin electrophoresis"],
    },
];

const UNMAPPED_RECOMMENDATIONS: &[&str] = &["Review variant with a clinical geneticist"];

fn disease_for(gene: &str) -> (String, &'static [&'static str]) {
    DISEASE_TABLE
        .iter()
        .find(|entry| entry.genes.iter().any(|g| g.eq_ignore_ascii_case(gene)))
        .map(|entry| (entry.disease.to_string(), entry.recommendations))
        .unwrap_or_else(|| (format!("{}-associated disorder", gene), UNMAPPED_RECOMMENDATIONS))
}

fn weight(significance: ClinicalSignificance) -> Option<f64> {
    match significance {
        ClinicalSignificance::Pathogenic => Some(PATHOGENIC_WEIGHT),
        ClinicalSignificance::LikelyPathogenic => Some(LIKELY_PATHOGENIC_WEIGHT),
        _ => None,
    }
}

#[derive(Default)]
struct DiseaseGroup<'a> {
    recommendations: &'static [&'static str],
    contributors: Vec<&'a VariantRecord>,
}

/// Assess disease risk from the quality-filtered variant set
pub fn assess<'a, I>(variants: I) -> RiskAssessment
where
    I: IntoIterator<Item = &'a VariantRecord>,
{
    let mut groups: BTreeMap<String, DiseaseGroup<'a>> = BTreeMap::new();

    for variant in variants {
        if !variant.clinical_significance.is_actionable() {
            continue;
        }
        let (disease, recommendations) = disease_for(&variant.gene);
        let group = groups.entry(disease).or_default();
        group.recommendations = recommendations;
        group.contributors.push(variant);
    }

    let mut disease_risks: Vec<DiseaseRisk> = groups
        .into_iter()
        .map(|(disease, group)| score_group(disease, group))
        .collect();

    disease_risks.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));

    let overall_risk = disease_risks
        .iter()
        .map(|risk| risk.risk_score)
        .fold(None, |max: Option<f64>, score| Some(max.map_or(score, |m| m.max(score))))
        .map(RiskLevel::from_score)
        .unwrap_or(RiskLevel::Low);

    RiskAssessment {
        overall_risk,
        disease_risks,
    }
}

fn score_group(disease: String, group: DiseaseGroup<'_>) -> DiseaseRisk {
    let remaining = group
        .contributors
        .iter()
        .filter_map(|v| weight(v.clinical_significance))
        .fold(1.0, |acc, w| acc * (1.0 - w));
    let risk_score = (1.0 - remaining).min(MAX_RISK_SCORE);

    let quality_confidence = group
        .contributors
        .iter()
        .map(|v| (v.quality / FULL_CONFIDENCE_QUALITY).clamp(0.0, 1.0))
        .sum::<f64>()
        / group.contributors.len() as f64;

    let any_likely = group
        .contributors
        .iter()
        .any(|v| v.clinical_significance == ClinicalSignificance::LikelyPathogenic);
    let confidence = if any_likely {
        quality_confidence * LIKELY_PATHOGENIC_CONFIDENCE
    } else {
        quality_confidence
    };

    DiseaseRisk {
        disease,
        risk_score,
        confidence,
        contributing_variants: group.contributors.iter().map(|v| v.id.clone()).collect(),
        recommendations: group.recommendations.iter().map(|r| r.to_string()).collect(),
    }
}
