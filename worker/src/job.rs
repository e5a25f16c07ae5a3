// ==============================================================================
// job.rs - Analysis Job Model
// ==============================================================================
// Description: Job record, status state machine and progress updates
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// State machine:
//   queued -> processing -> completed
//   queued -> failed            (cancelled, timed out, recovered)
//   processing -> failed
// completed and failed are final.
// ==============================================================================

use chrono::{DateTime, Utc};
use genomic_analysis::models::{AnalysisOptions, AnalysisRun};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-submission options: analysis switches plus an optional timeout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(flatten)]
    pub analysis: AnalysisOptions,

    /// Fail the job if analysis has not finished after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub patient_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Last time the owning process recorded activity
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    pub result: Option<AnalysisRun>,
    pub error: Option<String>,
    /// Last progress message
    pub message: String,
    pub timeout_secs: Option<u64>,
}

impl Job {
    pub fn new(patient_id: &str, timeout_secs: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            status: JobStatus::Queued,
            progress: 0,
            start_time: now,
            end_time: None,
            updated_at: now,
            result: None,
            error: None,
            message: "queued".to_string(),
            timeout_secs,
        }
    }

    fn check(&self, next: JobStatus) -> Result<(), OrchestratorError> {
        if self.status.is_terminal() {
            return Err(OrchestratorError::AlreadyTerminal {
                id: self.id,
                status: self.status,
            });
        }
        if self.status != next && !self.status.can_transition_to(next) {
            return Err(OrchestratorError::IllegalTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        Ok(())
    }

    /// queued -> processing
    pub fn begin(&mut self, progress: u8, message: &str) -> Result<(), OrchestratorError> {
        if self.status != JobStatus::Queued {
            return Err(OrchestratorError::IllegalTransition {
                id: self.id,
                from: self.status,
                to: JobStatus::Processing,
            });
        }
        self.status = JobStatus::Processing;
        self.progress = progress.min(99);
        self.message = message.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Progress while processing; never decreases and stays below 100
    pub fn advance(&mut self, progress: u8, message: &str) -> Result<(), OrchestratorError> {
        self.check(JobStatus::Processing)?;
        if self.status != JobStatus::Processing {
            return Err(OrchestratorError::IllegalTransition {
                id: self.id,
                from: self.status,
                to: JobStatus::Processing,
            });
        }
        self.progress = self.progress.max(progress.min(99));
        self.message = message.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record liveness without changing what subscribers see
    pub fn touch(&mut self) -> Result<(), OrchestratorError> {
        self.check(self.status)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self, run: AnalysisRun) -> Result<(), OrchestratorError> {
        self.check(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.end_time = Some(Utc::now());
        self.updated_at = Utc::now();
        self.result = Some(run);
        self.message = "completed".to_string();
        Ok(())
    }

    pub fn fail(&mut self, error: &str) -> Result<(), OrchestratorError> {
        self.check(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.progress = 0;
        self.end_time = Some(Utc::now());
        self.updated_at = Utc::now();
        self.error = Some(error.to_string());
        self.message = format!("failed: {}", error);
        Ok(())
    }

    /// Pub/sub message for this snapshot
    pub fn update(&self) -> JobUpdate {
        JobUpdate {
            job_id: self.id,
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            error: self.error.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Progress message published on the job's channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}
