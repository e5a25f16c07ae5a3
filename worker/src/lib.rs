// ==============================================================================
// lib.rs - Analysis Worker Library
// ==============================================================================
// Description: Job orchestration over the genomic analysis engine
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod config;
pub mod error;
pub mod job;
pub mod job_store;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use job::{Job, JobOptions, JobStatus, JobUpdate};
pub use job_store::JobStore;
pub use orchestrator::{Orchestrator, SubscriptionHandle, CANCELLED_MESSAGE, INTERRUPTED_MESSAGE};
