// ==============================================================================
// state.rs - Application State Management
// ==============================================================================
// Description: Shared orchestrator and submission rate limiter
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use analysis_worker::{Orchestrator, OrchestratorConfig};
use anyhow::{Context, Result};
use genomic_analysis::annotation::AnnotationTable;
use genomic_analysis::{AnalysisEngine, RedisStore, StoreConfig};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const DEFAULT_SUBMISSIONS_PER_SECOND: u32 = 10;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    orchestrator: Orchestrator,

    /// Global limit on job submissions
    submit_limiter: DefaultDirectRateLimiter,
}

impl AppState {
    /// Connect to the store and build the orchestrator from environment
    pub async fn new() -> Result<Self> {
        let store_config = StoreConfig::from_env().context("Store configuration is incomplete")?;
        let store = RedisStore::connect(&store_config)
            .await
            .context("Failed to connect to the key-value store")?;
        info!("Connected to key-value store");

        let config = OrchestratorConfig::from_env().context("Invalid orchestrator configuration")?;

        let table = match std::env::var("ANNOTATION_TABLE_PATH") {
            Ok(path) => AnnotationTable::from_path(Path::new(&path))
                .with_context(|| format!("Failed to load annotation table {}", path))?,
            Err(_) => AnnotationTable::empty(),
        };
        info!("Loaded {} annotation(s)", table.len());

        let per_second = match std::env::var("SUBMIT_RATE_PER_SECOND") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .context("SUBMIT_RATE_PER_SECOND must be a positive integer")?,
            Err(_) => DEFAULT_SUBMISSIONS_PER_SECOND,
        };

        let orchestrator = Orchestrator::new(
            Arc::new(store),
            Arc::new(AnalysisEngine::with_table(table)),
            config,
        );

        Ok(Self::with_orchestrator(orchestrator, per_second))
    }

    /// State around an existing orchestrator; the rate is at least one per second
    pub fn with_orchestrator(orchestrator: Orchestrator, submissions_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(submissions_per_second).unwrap_or(NonZeroU32::MIN));

        Self {
            inner: Arc::new(AppStateInner {
                orchestrator,
                submit_limiter: RateLimiter::direct(quota),
            }),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    /// Consume one submission permit; false when over the limit
    pub fn allow_submission(&self) -> bool {
        self.inner.submit_limiter.check().is_ok()
    }
}
