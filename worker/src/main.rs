// ==============================================================================
// main.rs - Analysis Worker Maintenance Process
// ==============================================================================
// Description: Recovers abandoned jobs and expires old job records
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

use analysis_worker::{Orchestrator, OrchestratorConfig};
use genomic_analysis::annotation::AnnotationTable;
use genomic_analysis::{AnalysisEngine, RedisStore, StoreConfig};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting Analysis Worker v{}", env!("CARGO_PKG_VERSION"));

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

    let orchestrator = Orchestrator::new(
        Arc::new(store),
        Arc::new(AnalysisEngine::with_table(table)),
        config.clone(),
    );

    info!("Checking for stuck jobs from previous worker instance...");
    match orchestrator.recover_stale_jobs(config.stale_after).await {
        Ok(recovered) if recovered > 0 => info!("Recovered {} stuck job(s)", recovered),
        Ok(_) => {}
        Err(e) => error!("Failed to recover stuck jobs: {}", e),
    }

    let cleanup = orchestrator.clone();
    let cleanup_interval = config.cleanup_interval;
    let retention_hours = config.retention_hours;
    tokio::spawn(async move {
        cleanup.cleanup_loop(cleanup_interval, retention_hours).await;
    });

    info!("Worker ready");
    let mut recovery = tokio::time::interval(config.stale_after.max(Duration::from_secs(60)));
    recovery.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping worker");
                return Ok(());
            }
            _ = recovery.tick() => {
                if let Err(e) = orchestrator.recover_stale_jobs(config.stale_after).await {
                    error!("Stale job recovery failed: {}", e);
                }
            }
        }
    }
}
