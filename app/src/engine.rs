// ==============================================================================
// engine.rs - Analysis Engine
// ==============================================================================
// Description: Parses raw input, fans out sub-analyses and assembles the run
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Pipeline:
// 1. Parse raw input (annotation provider fills missing fields)
// 2. Fan out: classification, pharmacogenomics, structural, CNV, quality
// 3. Fan in: optional failures degrade to empty, required failures abort all
// 4. Risk assessment over the classified variants
// 5. Assemble the AnalysisRun
// ==============================================================================

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::analysis::{classification, pharmacogenomics, quality, risk, structural};
use crate::analysis::{Classification, PharmacogenomicKnowledgeBase, StaticPharmacogenomicKnowledgeBase};
use crate::annotation::{AnnotationProvider, AnnotationTable};
use crate::error::{AnalysisError, SubAnalysisKind};
use crate::models::{
    AnalysisOptions, AnalysisRun, AnalysisSummary, CopyNumberVariant, PharmacogenomicFinding,
    QualityMetrics, StructuralVariant,
};
use crate::parsers::{ParsedInput, RawInputParser};

/// Milestones reported while an analysis runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Parsed,
    SubAnalysisFinished {
        kind: SubAnalysisKind,
        completed: usize,
        total: usize,
    },
    RiskAssessed,
    Assembled,
}

pub type ProgressSender = mpsc::UnboundedSender<AnalysisStage>;

/// Anything that can turn a raw payload into an AnalysisRun
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        patient_id: &str,
        raw_input: &Value,
        options: &AnalysisOptions,
        progress: Option<&ProgressSender>,
    ) -> Result<AnalysisRun, AnalysisError>;
}

enum SubAnalysisOutput {
    Classification(Classification),
    Pharmacogenomics(Vec<PharmacogenomicFinding>),
    StructuralVariants(Vec<StructuralVariant>),
    CopyNumberVariants(Vec<CopyNumberVariant>),
    QualityMetrics(QualityMetrics),
}

type SubAnalysisResult = (SubAnalysisKind, Result<SubAnalysisOutput, AnalysisError>);

#[derive(Default)]
struct FanIn {
    classification: Option<Classification>,
    pharmacogenomics: Vec<PharmacogenomicFinding>,
    structural_variants: Vec<StructuralVariant>,
    copy_number_variants: Vec<CopyNumberVariant>,
    quality_metrics: Option<QualityMetrics>,
}

impl FanIn {
    fn absorb(&mut self, output: SubAnalysisOutput) {
        match output {
            SubAnalysisOutput::Classification(c) => self.classification = Some(c),
            SubAnalysisOutput::Pharmacogenomics(f) => self.pharmacogenomics = f,
            SubAnalysisOutput::StructuralVariants(v) => self.structural_variants = v,
            SubAnalysisOutput::CopyNumberVariants(v) => self.copy_number_variants = v,
            SubAnalysisOutput::QualityMetrics(m) => self.quality_metrics = Some(m),
        }
    }
}

pub struct AnalysisEngine {
    parser: RawInputParser,
    knowledge_base: Arc<dyn PharmacogenomicKnowledgeBase>,
}

impl AnalysisEngine {
    pub fn new(
        annotations: Arc<dyn AnnotationProvider>,
        knowledge_base: Arc<dyn PharmacogenomicKnowledgeBase>,
    ) -> Self {
        Self {
            parser: RawInputParser::new(annotations),
            knowledge_base,
        }
    }

    /// Engine backed by an annotation table and the built-in PGx table
    pub fn with_table(table: AnnotationTable) -> Self {
        Self::new(
            Arc::new(table),
            Arc::new(StaticPharmacogenomicKnowledgeBase::new()),
        )
    }

    fn spawn_sub_analyses(&self, parsed: Arc<ParsedInput>, options: &AnalysisOptions) -> JoinSet<SubAnalysisResult> {
        let mut tasks = JoinSet::new();
        let threshold = options.quality_threshold;

        let input = Arc::clone(&parsed);
        spawn_guarded(&mut tasks, SubAnalysisKind::Classification, async move {
            Ok(SubAnalysisOutput::Classification(classification::classify(
                &input.variants,
                threshold,
            )))
        });

        if options.include_pharmacogenomics {
            let input = Arc::clone(&parsed);
            let knowledge_base = Arc::clone(&self.knowledge_base);
            spawn_guarded(&mut tasks, SubAnalysisKind::Pharmacogenomics, async move {
                let passing = classification::passing_variants(&input.variants, threshold);
                let findings = pharmacogenomics::analyze(knowledge_base.as_ref(), passing).await?;
                Ok(SubAnalysisOutput::Pharmacogenomics(findings))
            });
        }

        if options.include_structural_variants {
            let input = Arc::clone(&parsed);
            spawn_guarded(&mut tasks, SubAnalysisKind::StructuralVariants, async move {
                Ok(SubAnalysisOutput::StructuralVariants(
                    structural::annotate_structural(&input.structural_variants),
                ))
            });
        }

        if options.include_copy_number_variants {
            let input = Arc::clone(&parsed);
            spawn_guarded(&mut tasks, SubAnalysisKind::CopyNumberVariants, async move {
                Ok(SubAnalysisOutput::CopyNumberVariants(
                    structural::annotate_copy_number(&input.copy_number_variants),
                ))
            });
        }

        let input = parsed;
        spawn_guarded(&mut tasks, SubAnalysisKind::QualityMetrics, async move {
            Ok(SubAnalysisOutput::QualityMetrics(quality::compute(
                classification::passing_variants(&input.variants, threshold),
            )))
        });

        tasks
    }
}

/// Spawn a sub-analysis whose panics come back as errors
fn spawn_guarded<F>(tasks: &mut JoinSet<SubAnalysisResult>, kind: SubAnalysisKind, future: F)
where
    F: Future<Output = Result<SubAnalysisOutput, AnalysisError>> + Send + 'static,
{
    tasks.spawn(async move {
        let outcome = match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(AnalysisError::SubAnalysis {
                kind,
                message: format!("panicked: {}", panic_message(payload.as_ref())),
            }),
        };
        (kind, outcome)
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn report(progress: Option<&ProgressSender>, stage: AnalysisStage) {
    if let Some(sender) = progress {
        // Receiver may be gone once the job is cancelled
        let _ = sender.send(stage);
    }
}

#[async_trait]
impl Analyzer for AnalysisEngine {
    async fn analyze(
        &self,
        patient_id: &str,
        raw_input: &Value,
        options: &AnalysisOptions,
        progress: Option<&ProgressSender>,
    ) -> Result<AnalysisRun, AnalysisError> {
        let started = Instant::now();

        // 1. Parse
        let parsed = Arc::new(self.parser.parse(raw_input).await?);
        info!(
            "Parsed {} variants for patient {} ({} structural, {} copy-number)",
            parsed.variants.len(),
            patient_id,
            parsed.structural_variants.len(),
            parsed.copy_number_variants.len()
        );
        report(progress, AnalysisStage::Parsed);

        // 2. Fan out
        let mut tasks = self.spawn_sub_analyses(parsed, options);
        let total = tasks.len();
        let mut completed = 0;
        let mut fan_in = FanIn::default();

        // 3. Fan in
        while let Some(joined) = tasks.join_next().await {
            let (kind, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tasks.abort_all();
                    return Err(AnalysisError::Analysis(format!("sub-analysis task failed: {}", e)));
                }
            };

            match outcome {
                Ok(output) => fan_in.absorb(output),
                Err(e) if kind.is_required() => {
                    tasks.abort_all();
                    error!("Required sub-analysis {} failed for patient {}: {}", kind, patient_id, e);
                    return Err(AnalysisError::Analysis(format!("{} failed: {}", kind, e)));
                }
                Err(e) => {
                    warn!(
                        "Optional sub-analysis {} failed for patient {}, continuing without it: {}",
                        kind, patient_id, e
                    );
                }
            }

            completed += 1;
            debug!("Sub-analysis {} finished ({}/{})", kind, completed, total);
            report(progress, AnalysisStage::SubAnalysisFinished { kind, completed, total });
        }

        let classification = fan_in.classification.ok_or_else(|| {
            AnalysisError::Analysis("classification produced no output".to_string())
        })?;
        let quality_metrics = fan_in.quality_metrics.ok_or_else(|| {
            AnalysisError::Analysis("quality metrics produced no output".to_string())
        })?;

        // 4. Risk assessment
        let risk_assessment = risk::assess(&classification.passing);
        report(progress, AnalysisStage::RiskAssessed);

        // 5. Assemble
        let mut summary = AnalysisSummary {
            quality_metrics,
            ..Default::default()
        };
        classification.apply_to(&mut summary);
        summary.processing_time_ms = started.elapsed().as_millis() as u64;

        let run = AnalysisRun {
            patient_id: patient_id.to_string(),
            variants: classification.passing,
            summary,
            risk_assessment,
            pharmacogenomics: fan_in.pharmacogenomics,
            structural_variants: fan_in.structural_variants,
            copy_number_variants: fan_in.copy_number_variants,
            analyzed_at: Utc::now(),
        };
        report(progress, AnalysisStage::Assembled);

        info!(
            "Analysis complete for patient {}: {} variants, overall risk {:?}, {} ms",
            patient_id,
            run.summary.total_variants,
            run.risk_assessment.overall_risk,
            run.summary.processing_time_ms
        );

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DrugEffect, RiskLevel, VariantRecord};
    use serde_json::json;

    struct FailingKnowledgeBase;

    #[async_trait]
    impl PharmacogenomicKnowledgeBase for FailingKnowledgeBase {
        async fn findings_for(&self, _variant: &VariantRecord) -> Result<Vec<PharmacogenomicFinding>, AnalysisError> {
            Err(AnalysisError::Analysis("knowledge base unreachable".to_string()))
        }
    }

    struct PanickingKnowledgeBase;

    #[async_trait]
    impl PharmacogenomicKnowledgeBase for PanickingKnowledgeBase {
        async fn findings_for(&self, _variant: &VariantRecord) -> Result<Vec<PharmacogenomicFinding>, AnalysisError> {
            panic!("corrupt drug table");
        }
    }

    fn scenario_input() -> Value {
        json!({
            "format": "json",
            "variants": [
                {"chromosome": "17", "position": 43044295, "reference": "A", "alternate": "G",
                 "gene": "BRCA1", "clinicalSignificance": "pathogenic", "quality": 25, "depth": 35},
                {"chromosome": "2", "position": 179000000, "reference": "C", "alternate": "T",
                 "gene": "TTN", "clinicalSignificance": "benign", "quality": 15, "depth": 12},
                {"chromosome": "14", "position": 23400000, "reference": "G", "alternate": "C",
                 "gene": "MYH7", "clinicalSignificance": "uncertain_significance", "quality": 30, "depth": 22},
                {"chromosome": "10", "position": 94781859, "reference": "G", "alternate": "A",
                 "gene": "CYP2C19", "clinicalSignificance": "benign", "quality": 10, "depth": 40},
                {"chromosome": "10", "position": 94842866, "reference": "A", "alternate": "G",
                 "gene": "CYP2C9", "clinicalSignificance": "benign", "quality": 5}
            ]
        })
    }

    fn engine_with(knowledge_base: Arc<dyn PharmacogenomicKnowledgeBase>) -> AnalysisEngine {
        AnalysisEngine::new(Arc::new(AnnotationTable::empty()), knowledge_base)
    }

    #[tokio::test]
    async fn test_scenario_counts() {
        let raw = json!({
            "format": "json",
            "variants": [
                {"chromosome": "17", "position": 43044295, "reference": "A", "alternate": "G",
                 "gene": "BRCA1", "clinicalSignificance": "pathogenic", "quality": 25},
                {"chromosome": "2", "position": 179000000, "reference": "C", "alternate": "T",
                 "clinicalSignificance": "benign", "quality": 15},
                {"chromosome": "14", "position": 23400000, "reference": "G", "alternate": "C",
                 "clinicalSignificance": "uncertain_significance", "quality": 30}
            ]
        });
        let engine = AnalysisEngine::with_table(AnnotationTable::empty());
        let run = engine
            .analyze("patient-1", &raw, &AnalysisOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(run.variants.len(), 2);
        assert_eq!(run.summary.total_variants, 2);
        assert_eq!(run.summary.filtered_variants, 1);
        assert_eq!(run.summary.pathogenic_variants, 1);
        assert_eq!(run.summary.vus_variants, 1);
        assert_eq!(run.summary.benign_variants, 0);
        assert_eq!(run.risk_assessment.overall_risk, RiskLevel::VeryHigh);
        assert_eq!(run.patient_id, "patient-1");
    }

    #[tokio::test]
    async fn test_pharmacogenomics_failure_degrades() {
        let options = AnalysisOptions {
            quality_threshold: 8.0,
            ..Default::default()
        };
        let healthy = engine_with(Arc::new(StaticPharmacogenomicKnowledgeBase::new()))
            .analyze("p", &scenario_input(), &options, None)
            .await
            .unwrap();
        let failing = engine_with(Arc::new(FailingKnowledgeBase))
            .analyze("p", &scenario_input(), &options, None)
            .await
            .unwrap();

        assert_eq!(healthy.pharmacogenomics.len(), 1);
        assert_eq!(healthy.pharmacogenomics[0].drug, "clopidogrel");
        assert_eq!(healthy.pharmacogenomics[0].effect, DrugEffect::DecreasedSensitivity);

        assert!(failing.pharmacogenomics.is_empty());
        assert_eq!(failing.variants, healthy.variants);
        assert_eq!(failing.summary.quality_metrics, healthy.summary.quality_metrics);
        assert_eq!(failing.summary.pathogenic_variants, 1);
        assert_eq!(failing.summary.total_variants, 4);
    }

    #[tokio::test]
    async fn test_panicking_sub_analysis_is_contained() {
        let options = AnalysisOptions {
            quality_threshold: 8.0,
            ..Default::default()
        };
        let run = engine_with(Arc::new(PanickingKnowledgeBase))
            .analyze("p", &scenario_input(), &options, None)
            .await
            .unwrap();
        assert!(run.pharmacogenomics.is_empty());
        assert_eq!(run.summary.total_variants, 4);
    }

    #[tokio::test]
    async fn test_malformed_input_fails_without_result() {
        let engine = AnalysisEngine::with_table(AnnotationTable::empty());
        let err = engine
            .analyze("p", &json!({"format": "xml", "variants": []}), &AnalysisOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedInput(ref m) if m.contains("unsupported input format")));
    }

    #[tokio::test]
    async fn test_empty_input_defaults() {
        let engine = AnalysisEngine::with_table(AnnotationTable::empty());
        let run = engine
            .analyze("p", &json!({"format": "vcf", "variants": []}), &AnalysisOptions::default(), None)
            .await
            .unwrap();
        assert!(run.variants.is_empty());
        assert_eq!(run.summary.quality_metrics, QualityMetrics::default());
        assert_eq!(run.risk_assessment.overall_risk, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_optional_sub_analyses_run_only_when_requested() {
        let raw = json!({
            "format": "json",
            "variants": [],
            "structural_variants": [{"type": "DEL", "chromosome": "17", "start": 100, "end": 5000, "genes": ["BRCA1"]}],
            "copy_number_variants": [{"chromosome": "22", "start": 100, "end": 2000000, "copy_number": 1, "genes": ["TBX1"]}]
        });
        let engine = AnalysisEngine::with_table(AnnotationTable::empty());

        let skipped = engine
            .analyze("p", &raw, &AnalysisOptions::default(), None)
            .await
            .unwrap();
        assert!(skipped.structural_variants.is_empty());
        assert!(skipped.copy_number_variants.is_empty());

        let options = AnalysisOptions {
            include_structural_variants: true,
            include_copy_number_variants: true,
            ..Default::default()
        };
        let run = engine.analyze("p", &raw, &options, None).await.unwrap();
        assert_eq!(run.structural_variants.len(), 1);
        assert!(run.structural_variants[0].clinical_relevance.contains("BRCA1"));
        assert!(run.copy_number_variants[0].clinical_relevance.starts_with("likely pathogenic"));
    }

    #[tokio::test]
    async fn test_stage_reporting_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = AnalysisEngine::with_table(AnnotationTable::empty());
        engine
            .analyze("p", &scenario_input(), &AnalysisOptions::default(), Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut stages = Vec::new();
        while let Some(stage) = rx.recv().await {
            stages.push(stage);
        }

        assert_eq!(stages.first(), Some(&AnalysisStage::Parsed));
        assert_eq!(stages.last(), Some(&AnalysisStage::Assembled));
        let finished: Vec<usize> = stages
            .iter()
            .filter_map(|s| match s {
                AnalysisStage::SubAnalysisFinished { completed, total, .. } => {
                    assert_eq!(*total, 3);
                    Some(*completed)
                }
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec![1, 2, 3]);
    }
}
