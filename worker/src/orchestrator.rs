// ==============================================================================
// orchestrator.rs - Job Orchestrator
// ==============================================================================
// Description: Runs analyses as cancellable, pollable background jobs
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Progress milestones:
//   5  processing started        30  input parsed
//   10 result cache lookup       35-80 sub-analyses finishing
//   20 analysis running          90  risk assessed, 95 assembled
//   100 completed (only on success)
//
// Every mutation of a job goes through `Orchestrator::apply`, which holds the
// job's lock while it checks the transition, persists the record, publishes
// the update and fans the snapshot out to subscribers. Updates for one job are
// therefore delivered in the order they happen.
//
// Subscribers to jobs owned by another process are served by polling the
// durable store, so they observe changes at least one poll interval late.
// Cancelling or recovering a job owned elsewhere leaves a stop request next to
// the record; the owner checks for it before every mutation and on each
// heartbeat, then fails the job with the requested reason and stops the task.
// The store has no compare-and-set, so a save racing the request can briefly
// win until the owner's next check rewrites the record as failed.
// Identical submissions running at the same time are not deduplicated; the
// result cache only short-circuits submissions made after a run has finished.
// ==============================================================================

use chrono::{DateTime, Utc};
use futures::FutureExt;
use genomic_analysis::models::{AnalysisOptions, AnalysisRun};
use genomic_analysis::parsers::InputFormat;
use genomic_analysis::{cache_key, AnalysisError, AnalysisStage, Analyzer, KeyValueStore, ResultCache};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::job::{Job, JobOptions, JobStatus};
use crate::job_store::JobStore;

pub const CANCELLED_MESSAGE: &str = "cancelled";
pub const INTERRUPTED_MESSAGE: &str =
    "interrupted: analysis worker restarted before completion; please resubmit";

const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

/// A state change requested for one job
enum JobChange {
    Begin,
    Progress(u8, String),
    /// Refreshes the durable record only; nothing is published
    Heartbeat,
    Complete(Box<AnalysisRun>),
    Fail(String),
}

struct EntryState {
    job: Job,
    subscribers: Vec<mpsc::UnboundedSender<Job>>,
}

/// In-process record of a job this orchestrator owns
struct JobEntry {
    id: Uuid,
    state: Mutex<EntryState>,
    cancel: CancellationToken,
}

impl JobEntry {
    fn new(job: Job) -> Self {
        Self {
            id: job.id,
            state: Mutex::new(EntryState {
                job,
                subscribers: Vec::new(),
            }),
            cancel: CancellationToken::new(),
        }
    }

    async fn snapshot(&self) -> Job {
        self.state.lock().await.job.clone()
    }
}

/// How the analysis phase of a job ended
enum Execution {
    Finished(AnalysisRun),
    Failed(String),
    Cancelled,
}

/// Handle to a running subscription
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stop delivering updates
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the terminal update has been delivered
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

struct Inner {
    analyzer: Arc<dyn Analyzer>,
    cache: ResultCache,
    jobs: JobStore,
    config: OrchestratorConfig,
    entries: RwLock<HashMap<Uuid, Arc<JobEntry>>>,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        analyzer: Arc<dyn Analyzer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                analyzer,
                cache: ResultCache::new(Arc::clone(&store)),
                jobs: JobStore::new(store, config.record_ttl_secs),
                config,
                entries: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Store reachability, for readiness probes
    pub async fn ping(&self) -> Result<(), OrchestratorError> {
        self.inner.jobs.ping().await
    }

    // ==========================================================================
    // SUBMIT
    // ==========================================================================

    /// Queue an analysis and return its job id without waiting for it
    pub async fn submit(
        &self,
        patient_id: &str,
        raw_input: Value,
        options: JobOptions,
    ) -> Result<Uuid, OrchestratorError> {
        let timeout_secs = options.timeout_secs.or(self.inner.config.default_timeout_secs);
        let job = Job::new(patient_id, timeout_secs);
        let id = job.id;

        self.inner.jobs.save(&job).await?;
        if let Err(e) = self.inner.jobs.publish_update(&job.update()).await {
            warn!("Failed to publish queued update for job {}: {}", id, e);
        }

        let entry = Arc::new(JobEntry::new(job));
        self.inner.entries.write().await.insert(id, Arc::clone(&entry));

        info!("Queued job {} for patient {}", id, patient_id);

        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run_job(entry, raw_input, options.analysis).await;
        });

        Ok(id)
    }

    async fn run_job(&self, entry: Arc<JobEntry>, raw_input: Value, options: AnalysisOptions) {
        let id = entry.id;

        // Unusable input never reaches processing
        if let Err(e) = InputFormat::detect(&raw_input) {
            let message = AnalysisError::from(e).to_string();
            warn!("Job {} rejected before processing: {}", id, message);
            if let Err(e) = self.apply(&entry, JobChange::Fail(message)).await {
                debug!("Job {} ended before it could be rejected: {}", id, e);
            }
            return;
        }

        if let Err(e) = self.apply(&entry, JobChange::Begin).await {
            debug!("Job {} ended before processing started: {}", id, e);
            return;
        }

        let change = match self.execute(&entry, &raw_input, &options).await {
            Execution::Finished(run) => JobChange::Complete(Box::new(run)),
            Execution::Failed(message) => {
                error!("Job {} failed: {}", id, message);
                JobChange::Fail(message)
            }
            Execution::Cancelled => {
                info!("Job {} stopped after cancellation", id);
                return;
            }
        };

        match self.apply(&entry, change).await {
            Ok(job) => info!("Job {} finished as {}", id, job.status),
            Err(e) => debug!("Discarding outcome of job {}: {}", id, e),
        }
    }

    async fn execute(&self, entry: &JobEntry, raw_input: &Value, options: &AnalysisOptions) -> Execution {
        let job = entry.snapshot().await;
        let key = cache_key(&job.patient_id, raw_input);

        self.progress(entry, 10, "checking result cache").await;
        match self.inner.cache.get(&key).await {
            Ok(Some(run)) => {
                info!("Job {} served from result cache", entry.id);
                return Execution::Finished(run);
            }
            Ok(None) => {}
            Err(e) => warn!("Result cache lookup failed for job {}: {}", entry.id, e),
        }

        self.progress(entry, 20, "running analysis").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let analysis = AssertUnwindSafe(self.inner.analyzer.analyze(
            &job.patient_id,
            raw_input,
            options,
            Some(&tx),
        ))
        .catch_unwind();
        tokio::pin!(analysis);

        let deadline = async {
            match job.timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let period = self.inner.config.heartbeat_interval.max(MIN_HEARTBEAT);
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = entry.cancel.cancelled() => return Execution::Cancelled,
                _ = &mut deadline => {
                    let secs = job.timeout_secs.unwrap_or_default();
                    entry.cancel.cancel();
                    return Execution::Failed(format!("timed out after {}s", secs));
                }
                Some(stage) = rx.recv() => self.report_stage(entry, stage).await,
                _ = heartbeat.tick() => {
                    if let Err(e) = self.apply(entry, JobChange::Heartbeat).await {
                        debug!("Skipping heartbeat for job {}: {}", entry.id, e);
                    }
                }
                outcome = &mut analysis => break outcome,
            }
        };

        while let Ok(stage) = rx.try_recv() {
            self.report_stage(entry, stage).await;
        }

        match outcome {
            Ok(Ok(run)) => {
                if let Err(e) = self
                    .inner
                    .cache
                    .put(&key, &run, self.inner.config.cache_ttl_secs)
                    .await
                {
                    warn!("Failed to cache result of job {}: {}", entry.id, e);
                }
                Execution::Finished(run)
            }
            Ok(Err(e)) => Execution::Failed(e.to_string()),
            Err(_) => Execution::Failed("analysis panicked".to_string()),
        }
    }

    async fn report_stage(&self, entry: &JobEntry, stage: AnalysisStage) {
        let (progress, message) = match stage {
            AnalysisStage::Parsed => (30, "input parsed".to_string()),
            AnalysisStage::SubAnalysisFinished { kind, completed, total } => {
                let span = 45 * completed / total.max(1);
                (35 + span as u8, format!("{} finished ({}/{})", kind, completed, total))
            }
            AnalysisStage::RiskAssessed => (90, "risk assessed".to_string()),
            AnalysisStage::Assembled => (95, "assembling results".to_string()),
        };
        self.progress(entry, progress, &message).await;
    }

    async fn progress(&self, entry: &JobEntry, progress: u8, message: &str) {
        if let Err(e) = self
            .apply(entry, JobChange::Progress(progress, message.to_string()))
            .await
        {
            debug!("Skipping progress for job {}: {}", entry.id, e);
        }
    }

    /// The only path that mutates a job
    async fn apply(&self, entry: &JobEntry, change: JobChange) -> Result<Job, OrchestratorError> {
        let mut state = entry.state.lock().await;

        if let Some(stopped) = self.honor_stop_request(entry, &mut state).await {
            return Err(OrchestratorError::AlreadyTerminal {
                id: stopped.id,
                status: stopped.status,
            });
        }

        let mut next = state.job.clone();
        let announce = !matches!(change, JobChange::Heartbeat);
        match change {
            JobChange::Begin => next.begin(5, "processing started")?,
            JobChange::Progress(progress, message) => next.advance(progress, &message)?,
            JobChange::Heartbeat => next.touch()?,
            JobChange::Complete(run) => next.complete(*run)?,
            JobChange::Fail(error) => next.fail(&error)?,
        }
        state.job = next.clone();

        if let Err(e) = self.inner.jobs.save(&next).await {
            error!("Failed to persist job {}: {}", next.id, e);
        }
        if announce {
            self.announce(&mut state, &next).await;
        }

        Ok(next)
    }

    /// Publish `job` and hand it to local subscribers, dropping them once terminal
    async fn announce(&self, state: &mut EntryState, job: &Job) {
        if let Err(e) = self.inner.jobs.publish_update(&job.update()).await {
            warn!("Failed to publish update for job {}: {}", job.id, e);
        }

        state.subscribers.retain(|tx| tx.send(job.clone()).is_ok());
        if job.status.is_terminal() {
            state.subscribers.clear();
        }
    }

    /// Fail a running job that another process asked to stop.
    ///
    /// Returns the failed snapshot when a request was honored. The record is
    /// saved again because a save of ours may have landed after the request.
    async fn honor_stop_request(&self, entry: &JobEntry, state: &mut EntryState) -> Option<Job> {
        if state.job.status.is_terminal() {
            return None;
        }

        let reason = match self.inner.jobs.stop_request(entry.id).await {
            Ok(Some(reason)) => reason,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to check stop request for job {}: {}", entry.id, e);
                return None;
            }
        };

        let mut stopped = state.job.clone();
        if let Err(e) = stopped.fail(&reason) {
            debug!("Ignoring stop request for job {}: {}", entry.id, e);
            return None;
        }
        state.job = stopped.clone();
        entry.cancel.cancel();
        info!("Job {} stopped on request: {}", entry.id, reason);

        if let Err(e) = self.inner.jobs.save(&stopped).await {
            error!("Failed to persist job {}: {}", stopped.id, e);
        }
        self.announce(state, &stopped).await;

        Some(stopped)
    }

    async fn entry(&self, id: Uuid) -> Option<Arc<JobEntry>> {
        self.inner.entries.read().await.get(&id).cloned()
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    /// Current snapshot: in-process entry first, then the durable store
    pub async fn get_status(&self, id: Uuid) -> Result<Option<Job>, OrchestratorError> {
        if let Some(entry) = self.entry(id).await {
            let mut state = entry.state.lock().await;
            if let Some(stopped) = self.honor_stop_request(&entry, &mut state).await {
                return Ok(Some(stopped));
            }
            return Ok(Some(state.job.clone()));
        }
        self.inner.jobs.load(id).await
    }

    /// The run, only once the job has completed
    pub async fn get_result(&self, id: Uuid) -> Result<Option<AnalysisRun>, OrchestratorError> {
        Ok(self
            .get_status(id)
            .await?
            .filter(|job| job.status == JobStatus::Completed)
            .and_then(|job| job.result))
    }

    // ==========================================================================
    // SUBSCRIBE
    // ==========================================================================

    /// Invoke `on_update` with the current snapshot and every later change,
    /// ending after the terminal snapshot has been delivered.
    pub async fn subscribe<F>(&self, id: Uuid, mut on_update: F) -> Result<SubscriptionHandle, OrchestratorError>
    where
        F: FnMut(Job) + Send + 'static,
    {
        if let Some(entry) = self.entry(id).await {
            let (tx, mut rx) = mpsc::unbounded_channel();
            {
                let mut state = entry.state.lock().await;
                let _ = tx.send(state.job.clone());
                if !state.job.status.is_terminal() {
                    state.subscribers.push(tx);
                }
            }

            let task = tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    let terminal = job.status.is_terminal();
                    on_update(job);
                    if terminal {
                        break;
                    }
                }
            });
            return Ok(SubscriptionHandle { task });
        }

        let first = self
            .inner
            .jobs
            .load(id)
            .await?
            .ok_or(OrchestratorError::NotFound(id))?;

        let jobs = self.inner.jobs.clone();
        let interval = self.inner.config.poll_interval;
        let task = tokio::spawn(async move {
            let mut last = first;
            let terminal = last.status.is_terminal();
            on_update(last.clone());
            if terminal {
                return;
            }

            loop {
                tokio::time::sleep(interval).await;
                let current = match jobs.load(id).await {
                    Ok(Some(job)) => job,
                    Ok(None) => {
                        warn!("Job {} disappeared while subscribed", id);
                        return;
                    }
                    Err(e) => {
                        warn!("Polling job {} failed: {}", id, e);
                        continue;
                    }
                };

                let changed = current.status != last.status
                    || current.progress != last.progress
                    || current.message != last.message;
                if !changed {
                    continue;
                }

                let terminal = current.status.is_terminal();
                last = current.clone();
                on_update(current);
                if terminal {
                    return;
                }
            }
        });

        Ok(SubscriptionHandle { task })
    }

    // ==========================================================================
    // CANCEL
    // ==========================================================================

    /// Fail a queued or processing job with "cancelled" and stop its task
    pub async fn cancel(&self, id: Uuid) -> Result<Job, OrchestratorError> {
        if let Some(entry) = self.entry(id).await {
            let job = self
                .apply(&entry, JobChange::Fail(CANCELLED_MESSAGE.to_string()))
                .await?;
            entry.cancel.cancel();
            info!("Cancelled job {}", id);
            return Ok(job);
        }

        // Owned by another process: record the cancellation durably
        let mut job = self
            .inner
            .jobs
            .load(id)
            .await?
            .ok_or(OrchestratorError::NotFound(id))?;
        job.fail(CANCELLED_MESSAGE)?;
        self.inner.jobs.request_stop(id, CANCELLED_MESSAGE).await?;
        self.inner.jobs.save(&job).await?;
        if let Err(e) = self.inner.jobs.publish_update(&job.update()).await {
            warn!("Failed to publish cancellation of job {}: {}", id, e);
        }
        info!("Cancelled job {} (owned elsewhere)", id);
        Ok(job)
    }

    // ==========================================================================
    // CLEANUP / RECOVERY
    // ==========================================================================

    /// Delete durable records of terminal jobs that ended more than
    /// `older_than_hours` ago; returns how many were deleted.
    ///
    /// In-process entries are only evicted once nothing else holds them.
    pub async fn cleanup(&self, older_than_hours: u64) -> Result<usize, OrchestratorError> {
        let cutoff = i64::try_from(older_than_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let deleted = self.inner.jobs.cleanup_terminal_older_than(cutoff).await?;

        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            // Running task, subscriber or caller still references it
            if Arc::strong_count(entry) > 1 {
                return true;
            }
            match entry.state.try_lock() {
                Ok(state) => {
                    let expired = state.job.status.is_terminal()
                        && state.job.end_time.map(|end| end < cutoff).unwrap_or(false);
                    let watched = state.subscribers.iter().any(|tx| !tx.is_closed());
                    !expired || watched
                }
                Err(_) => true,
            }
        });
        let evicted = before - entries.len();

        if !deleted.is_empty() || evicted > 0 {
            info!(
                "Cleanup deleted {} job record(s), evicted {} in-process entr(ies)",
                deleted.len(),
                evicted
            );
        }
        Ok(deleted.len())
    }

    /// Fail non-terminal jobs abandoned by a previous worker instance
    pub async fn recover_stale_jobs(&self, stale_after: Duration) -> Result<usize, OrchestratorError> {
        let stale_after = chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::zero());
        let cutoff = Utc::now() - stale_after;
        let stale = self.inner.jobs.find_stale(cutoff).await?;

        if stale.is_empty() {
            info!("No stuck jobs found");
            return Ok(0);
        }

        let owned = self.inner.entries.read().await;
        let mut recovered = 0;
        for mut job in stale {
            if owned.contains_key(&job.id) {
                continue;
            }
            warn!("Marking stuck job as failed: {} (patient: {})", job.id, job.patient_id);
            job.fail(INTERRUPTED_MESSAGE)?;
            self.inner.jobs.request_stop(job.id, INTERRUPTED_MESSAGE).await?;
            self.inner.jobs.save(&job).await?;
            if let Err(e) = self.inner.jobs.publish_update(&job.update()).await {
                warn!("Failed to publish recovery of job {}: {}", job.id, e);
            }
            recovered += 1;
        }

        Ok(recovered)
    }

    /// Run cleanup every `interval` until the task is dropped
    pub async fn cleanup_loop(&self, interval: Duration, retention_hours: u64) {
        loop {
            tokio::time::sleep(interval).await;

            info!("Running cleanup task");
            if let Err(e) = self.cleanup(retention_hours).await {
                error!("Cleanup task failed: {}", e);
            }
        }
    }
}
