// ==============================================================================
// lib.rs - Genomic Analysis Library
// ==============================================================================
// Description: Library interface shared by the analysis worker and gateway
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod analysis;
pub mod annotation;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod parsers;
pub mod store;

pub use cache::{cache_key, ResultCache};
pub use config::StoreConfig;
pub use engine::{AnalysisEngine, AnalysisStage, Analyzer, ProgressSender};
pub use error::{AnalysisError, SubAnalysisKind};
pub use store::{KeyValueStore, MemoryStore, RedisStore, StoreError};
