// ==============================================================================
// cache.rs - Result Cache
// ==============================================================================
// Description: Memoizes AnalysisRuns by patient id + content hash of raw input
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Key format: analysis:result:<patient_id>:<first 128 bits of SHA-256, hex>
// ==============================================================================

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::models::AnalysisRun;
use crate::store::KeyValueStore;

pub const CACHE_KEY_PREFIX: &str = "analysis:result";

/// Hex characters kept from the digest (128 bits)
const HASH_HEX_LEN: usize = 32;

/// Deterministic cache key for a patient's raw input.
///
/// `serde_json::Value` objects keep their keys sorted, so payloads that differ
/// only in key order serialize (and hash) identically.
pub fn cache_key(patient_id: &str, raw_input: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(patient_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(raw_input.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut hash = String::with_capacity(HASH_HEX_LEN);
    for byte in digest.iter().take(HASH_HEX_LEN / 2) {
        let _ = write!(hash, "{:02x}", byte);
    }

    format!("{}:{}:{}", CACHE_KEY_PREFIX, patient_id, hash)
}

/// Store-backed cache of finished analysis runs
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Previously stored run, or None when missing, expired or unreadable
    pub async fn get(&self, key: &str) -> Result<Option<AnalysisRun>, AnalysisError> {
        let raw = match self.store.get(key).await? {
            Some(raw) => raw,
            None => {
                debug!("Cache miss: {}", key);
                return Ok(None);
            }
        };

        match serde_json::from_str(&raw) {
            Ok(run) => {
                debug!("Cache hit: {}", key);
                Ok(Some(run))
            }
            Err(e) => {
                warn!("Ignoring undecodable cache entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Store a run, replacing any existing entry
    pub async fn put(&self, key: &str, run: &AnalysisRun, ttl_secs: u64) -> Result<(), AnalysisError> {
        let serialized = serde_json::to_string(run)?;
        self.store.set_with_expiry(key, &serialized, ttl_secs).await?;
        debug!("Cached {} for {}s", key, ttl_secs);
        Ok(())
    }
}
