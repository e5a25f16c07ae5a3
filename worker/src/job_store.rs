// ==============================================================================
// job_store.rs - Durable Job Records
// ==============================================================================
// Description: Job persistence and progress publishing over the key-value store
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Keys:
//   analysis:job:<uuid>        serialized Job, expires after the record TTL
//   analysis:progress:<uuid>   pub/sub channel carrying JobUpdate JSON
//   analysis:stop:<uuid>       failure reason recorded by a process that does
//                              not own the job; the owner never writes it
// ==============================================================================

use chrono::{DateTime, Utc};
use genomic_analysis::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::job::{Job, JobUpdate};

pub const JOB_KEY_PREFIX: &str = "analysis:job";
pub const PROGRESS_CHANNEL_PREFIX: &str = "analysis:progress";
pub const STOP_KEY_PREFIX: &str = "analysis:stop";

pub fn job_key(id: Uuid) -> String {
    format!("{}:{}", JOB_KEY_PREFIX, id)
}

pub fn progress_channel(id: Uuid) -> String {
    format!("{}:{}", PROGRESS_CHANNEL_PREFIX, id)
}

pub fn stop_key(id: Uuid) -> String {
    format!("{}:{}", STOP_KEY_PREFIX, id)
}

#[derive(Clone)]
pub struct JobStore {
    store: Arc<dyn KeyValueStore>,
    record_ttl_secs: u64,
}

impl JobStore {
    pub fn new(store: Arc<dyn KeyValueStore>, record_ttl_secs: u64) -> Self {
        Self {
            store,
            record_ttl_secs,
        }
    }

    pub async fn save(&self, job: &Job) -> Result<(), OrchestratorError> {
        let serialized = serde_json::to_string(job)?;
        self.store
            .set_with_expiry(&job_key(job.id), &serialized, self.record_ttl_secs)
            .await?;
        Ok(())
    }

    pub async fn load(&self, id: Uuid) -> Result<Option<Job>, OrchestratorError> {
        match self.store.get(&job_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, OrchestratorError> {
        if let Err(e) = self.store.delete(&stop_key(id)).await {
            warn!("Failed to delete stop request for job {}: {}", id, e);
        }
        Ok(self.store.delete(&job_key(id)).await?)
    }

    /// Ask the owning process to fail the job with `reason`.
    ///
    /// Kept apart from the job record so the owner's own saves cannot
    /// overwrite it.
    pub async fn request_stop(&self, id: Uuid, reason: &str) -> Result<(), OrchestratorError> {
        self.store
            .set_with_expiry(&stop_key(id), reason, self.record_ttl_secs)
            .await?;
        Ok(())
    }

    /// Failure reason recorded by [`JobStore::request_stop`], if any
    pub async fn stop_request(&self, id: Uuid) -> Result<Option<String>, OrchestratorError> {
        Ok(self.store.get(&stop_key(id)).await?)
    }

    pub async fn publish_update(&self, update: &JobUpdate) -> Result<(), OrchestratorError> {
        let message = serde_json::to_string(update)?;
        self.store
            .publish(&progress_channel(update.job_id), &message)
            .await?;
        Ok(())
    }

    /// Every readable job record; undecodable records are skipped
    pub async fn list_jobs(&self) -> Result<Vec<Job>, OrchestratorError> {
        let keys = self.store.keys(&format!("{}:*", JOB_KEY_PREFIX)).await?;
        let mut jobs = Vec::with_capacity(keys.len());

        for key in keys {
            // Record may have expired between KEYS and GET
            let raw = match self.store.get(&key).await? {
                Some(raw) => raw,
                None => continue,
            };
            match serde_json::from_str::<Job>(&raw) {
                Ok(job) => jobs.push(job),
                Err(e) => warn!("Skipping undecodable job record {}: {}", key, e),
            }
        }

        Ok(jobs)
    }

    /// Delete terminal jobs that ended before `cutoff`, returning their ids
    pub async fn cleanup_terminal_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, OrchestratorError> {
        let mut deleted = Vec::new();

        for job in self.list_jobs().await? {
            let expired = job.status.is_terminal() && job.end_time.map(|end| end < cutoff).unwrap_or(false);
            if !expired {
                continue;
            }
            if self.delete(job.id).await? {
                info!("Cleaned up job {} (patient: {})", job.id, job.patient_id);
                deleted.push(job.id);
            }
        }

        debug!("Cleanup removed {} job record(s)", deleted.len());
        Ok(deleted)
    }

    /// Non-terminal jobs whose owner has not recorded activity since `cutoff`
    pub async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>, OrchestratorError> {
        Ok(self
            .list_jobs()
            .await?
            .into_iter()
            .filter(|job| !job.status.is_terminal() && job.updated_at < cutoff)
            .collect())
    }

    pub async fn ping(&self) -> Result<(), OrchestratorError> {
        Ok(self.store.ping().await?)
    }
}
