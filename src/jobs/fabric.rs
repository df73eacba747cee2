//! The job fabric: dispatch/idempotency, the cooperative cancellation
//! checkpoint, retry-with-backoff, and best-effort chaining.
//!
//! A mixed sync+async port is split into a `Dispatch` (fire-and-forget,
//! returns a job id) port and an `Execute` (blocking, returns a result)
//! port — never one method doing both. Synchronization style
//! (`parking_lot`, atomics for cheap cross-thread flags) follows the
//! `performance`/`signals` modules used throughout `main.rs`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PitchSenseError, Result};
use crate::jobs::queue::{QueuedJob, QueueRegistry};
use crate::jobs::record::{JobError, JobKind, JobRecord, JobState};
use crate::jobs::store::{InMemoryJobStore, JobStore};

/// Fire-and-forget submission port: enqueue work, get a job id back
/// immediately. Never blocks on the work itself.
pub trait Dispatch: Send + Sync {
    fn dispatch(
        &self,
        kind: JobKind,
        idempotency_key: &str,
        correlation_id: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<DispatchOutcome>;

    fn status(&self, job_id: &str) -> Result<JobRecord>;
    fn cancel(&self, job_id: &str) -> Result<JobRecord>;
}

/// Blocking execution port: actually run a job's work and wait for
/// the result. Kept separate from `Dispatch` so no single method is
/// asked to be both fire-and-forget and blocking.
pub trait Execute: Send + Sync {
    fn run_with_retries<F>(&self, job_id: &str, work: F) -> Result<JobRecord>
    where
        F: FnMut(&CancellationToken) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub job_id: String,
    /// `true` if an in-flight or completed job for this
    /// `(kind, idempotency_key)` already existed and was returned
    /// instead of enqueuing a new run.
    pub already_existed: bool,
}

/// Cooperative cancellation flag checked at a job's batch/frame-loop
/// boundaries — every 500 frames or every possession sequence,
/// whichever a stage iterates over.
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Exponential backoff capped at a fixed ceiling.
fn backoff_delay(attempt: u32) -> Duration {
    const BASE_MS: u64 = 50;
    const CAP_MS: u64 = 5_000;
    let scaled = BASE_MS.saturating_mul(1u64.checked_shl(attempt.min(16)).unwrap_or(u64::MAX));
    Duration::from_millis(scaled.min(CAP_MS))
}

pub struct JobFabric {
    store: Arc<dyn JobStore>,
    queues: Arc<QueueRegistry>,
    cancellation_flags: RwLock<std::collections::HashMap<String, Arc<AtomicBool>>>,
    cancelled_jobs: RwLock<HashSet<String>>,
}

impl JobFabric {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryJobStore::new()),
            queues: Arc::new(QueueRegistry::new()),
            cancellation_flags: RwLock::new(std::collections::HashMap::new()),
            cancelled_jobs: RwLock::new(HashSet::new()),
        }
    }

    pub fn with_store(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            queues: Arc::new(QueueRegistry::new()),
            cancellation_flags: RwLock::new(std::collections::HashMap::new()),
            cancelled_jobs: RwLock::new(HashSet::new()),
        }
    }

    pub fn queues(&self) -> &QueueRegistry {
        &self.queues
    }

    fn cancellation_token(&self, job_id: &str) -> CancellationToken {
        let mut flags = self.cancellation_flags.write();
        let flag = flags
            .entry(job_id.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone();
        CancellationToken { flag }
    }

    /// Best-effort chained dispatch: on failure, logs and returns
    /// `None` rather than propagating — a chained job's failure to
    /// enqueue must never fail the parent.
    pub fn dispatch_chained(
        &self,
        kind: JobKind,
        idempotency_key: &str,
        correlation_id: &str,
        payload: Option<serde_json::Value>,
    ) -> Option<String> {
        match self.dispatch(kind, idempotency_key, correlation_id, payload) {
            Ok(outcome) => Some(outcome.job_id),
            Err(e) => {
                warn!(correlation_id, kind = ?kind, error = %e, "chained dispatch failed, not failing parent");
                None
            }
        }
    }
}

impl Default for JobFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatch for JobFabric {
    fn dispatch(
        &self,
        kind: JobKind,
        idempotency_key: &str,
        correlation_id: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<DispatchOutcome> {
        if let Some(existing) = self.store.find_by_idempotency_key(kind, idempotency_key) {
            return Ok(DispatchOutcome { job_id: existing, already_existed: true });
        }

        let job_id = Uuid::new_v4().to_string();
        let record = JobRecord::new(job_id.clone(), kind, idempotency_key, correlation_id, payload);
        self.store.insert(record);
        self.queues.enqueue(kind.queue_name(), QueuedJob { job_id: job_id.clone(), kind });
        info!(job_id, correlation_id, kind = ?kind, "job dispatched");
        Ok(DispatchOutcome { job_id, already_existed: false })
    }

    fn status(&self, job_id: &str) -> Result<JobRecord> {
        self.store
            .get(job_id)
            .ok_or_else(|| PitchSenseError::NotFound(format!("job {job_id}")))
    }

    fn cancel(&self, job_id: &str) -> Result<JobRecord> {
        let record = self.status(job_id)?;
        if record.is_terminal() {
            return Err(PitchSenseError::BadInput(format!(
                "cannot cancel job {job_id} already in terminal state {:?}",
                record.state
            )));
        }
        self.cancelled_jobs.write().insert(job_id.to_string());
        if let Some(flag) = self.cancellation_flags.read().get(job_id) {
            flag.store(true, Ordering::Relaxed);
        }

        if record.state == JobState::Pending {
            // Never started: fail immediately rather than waiting for
            // a worker to reach a checkpoint that will never execute.
            return self.store.compare_and_update(
                job_id,
                JobState::Pending,
                Box::new(|r| {
                    r.fail(JobError { kind: "Cancelled".to_string(), message: "cancelled before start".to_string() })
                }),
            );
        }
        Ok(record)
    }
}

impl Execute for JobFabric {
    fn run_with_retries<F>(&self, job_id: &str, mut work: F) -> Result<JobRecord>
    where
        F: FnMut(&CancellationToken) -> Result<serde_json::Value>,
    {
        let record = self.store.compare_and_update(job_id, JobState::Pending, Box::new(|r| r.start()))?;
        let token = self.cancellation_token(job_id);
        let max_retries = record.max_retries;
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                return self.store.compare_and_update(
                    job_id,
                    JobState::Running,
                    Box::new(|r| {
                        r.fail(JobError {
                            kind: "Cancelled".to_string(),
                            message: "cancelled at checkpoint".to_string(),
                        })
                    }),
                );
            }

            attempt += 1;
            match work(&token) {
                Ok(result) => {
                    let updated = self.store.compare_and_update(
                        job_id,
                        JobState::Running,
                        Box::new(|r| r.complete(result)),
                    )?;
                    metrics::counter!("pitchsense_jobs_completed_total", "kind" => format!("{:?}", updated.kind)).increment(1);
                    return Ok(updated);
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    let job_error = JobError::from(&e);
                    if retryable && attempt <= max_retries {
                        warn!(job_id, attempt, max_retries, error = %e, "transient failure, retrying");
                        std::thread::sleep(backoff_delay(attempt));
                        continue;
                    }
                    let updated = self.store.compare_and_update(
                        job_id,
                        JobState::Running,
                        Box::new(|r| r.fail(job_error)),
                    )?;
                    metrics::counter!("pitchsense_jobs_failed_total", "kind" => format!("{:?}", updated.kind)).increment(1);
                    return Ok(updated);
                }
            }
        }
    }
}
