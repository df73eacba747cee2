//! The typed job record and its state machine, shared by every
//! pipeline stage (ingestion, video-processing, calibration, metrics,
//! phase-classification, pattern-detection, analysis, report).
//!
//! Grounded on `original_source/.../entities/analysis_job.py` for the
//! shape of a single-entity state machine, mirrored here at the fabric
//! level rather than per-workflow — see `crate::domain::job::AnalysisJob`,
//! which is the distinct AI-query entity, not this record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PitchSenseError, Result};

/// Which pipeline stage a job record drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Ingestion,
    VideoProcessing,
    Calibration,
    Metrics,
    PhaseClassification,
    PatternDetection,
    Analysis,
    Report,
}

impl JobKind {
    /// Named dispatch queue this kind is routed to. Video processing
    /// and GPU-bound inference go to `gpu`; everything else to
    /// `default`.
    pub fn queue_name(self) -> &'static str {
        match self {
            JobKind::VideoProcessing => "gpu",
            _ => "default",
        }
    }

    /// Default retry ceiling. Stages without an explicit default
    /// (metrics, phase-classification, pattern-detection, analysis,
    /// report) retry once — they are typically CPU-bound and fast to
    /// resubmit rather than CPU-bound and slow like calibration.
    pub fn default_max_retries(self) -> u32 {
        match self {
            JobKind::Ingestion => 3,
            JobKind::VideoProcessing => 2,
            JobKind::Calibration => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A typed job record. `payload`/`result`/`error` are opaque JSON so
/// the fabric stays agnostic of any one stage's concrete types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub kind: JobKind,
    pub idempotency_key: String,
    pub correlation_id: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub state: JobState,
    pub progress_pct: u8,
    pub payload: Option<serde_json::Value>,
    pub result: Option<serde_json::Value>,
    pub error: Option<JobError>,
    pub attempt: u32,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobError {
    pub kind: String,
    pub message: String,
}

impl From<&PitchSenseError> for JobError {
    fn from(err: &PitchSenseError) -> Self {
        let kind = match err {
            PitchSenseError::BadInput(_) => "BadInput",
            PitchSenseError::NotFound(_) => "NotFound",
            PitchSenseError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            PitchSenseError::ModelNotTrained => "ModelNotTrained",
            PitchSenseError::Timeout => "Timeout",
            PitchSenseError::Cancelled => "Cancelled",
            PitchSenseError::Internal { .. } => "Internal",
        };
        JobError {
            kind: kind.to_string(),
            message: err.to_string(),
        }
    }
}

/// The external Job API's state vocabulary, distinct from the internal
/// `JobState` the fabric's transitions operate on: `Cancelled` is a
/// `Failed` record whose error kind is `Cancelled`, not a fifth
/// internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiJobState {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobRecord {
    pub fn api_state(&self) -> ApiJobState {
        match self.state {
            JobState::Pending => ApiJobState::Queued,
            JobState::Running => ApiJobState::Processing,
            JobState::Completed => ApiJobState::Completed,
            JobState::Failed => {
                if self.error.as_ref().map(|e| e.kind == "Cancelled").unwrap_or(false) {
                    ApiJobState::Cancelled
                } else {
                    ApiJobState::Failed
                }
            }
        }
    }

    pub fn new(
        job_id: impl Into<String>,
        kind: JobKind,
        idempotency_key: impl Into<String>,
        correlation_id: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            idempotency_key: idempotency_key.into(),
            correlation_id: correlation_id.into(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            state: JobState::Pending,
            progress_pct: 0,
            payload,
            result: None,
            error: None,
            attempt: 0,
            max_retries: kind.default_max_retries(),
        }
    }

    /// pending -> running. Allowed exactly once per job.
    pub fn start(&mut self) -> Result<()> {
        if self.state != JobState::Pending {
            return Err(PitchSenseError::BadInput(format!(
                "cannot start job {} from state {:?}",
                self.job_id, self.state
            )));
        }
        self.state = JobState::Running;
        self.started_at = Some(Utc::now());
        self.attempt += 1;
        Ok(())
    }

    /// running -> completed. A result is required.
    pub fn complete(&mut self, result: serde_json::Value) -> Result<()> {
        if self.state != JobState::Running {
            return Err(PitchSenseError::BadInput(format!(
                "cannot complete job {} from state {:?}",
                self.job_id, self.state
            )));
        }
        self.state = JobState::Completed;
        self.result = Some(result);
        self.progress_pct = 100;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// any non-terminal state -> failed. Failing an already-completed
    /// job is disallowed; starting from any terminal state is
    /// disallowed by construction (only `Running` jobs reach `fail`
    /// through the fabric's retry loop, but direct callers are still
    /// guarded here).
    pub fn fail(&mut self, error: JobError) -> Result<()> {
        if self.state.is_terminal() {
            return Err(PitchSenseError::BadInput(format!(
                "cannot fail job {} already in terminal state {:?}",
                self.job_id, self.state
            )));
        }
        self.state = JobState::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether this job's current failure (if any) should be retried:
    /// the error is retryable and the attempt count hasn't hit the
    /// ceiling.
    pub fn should_retry(&self) -> bool {
        self.state == JobState::Failed
            && self.attempt <= self.max_retries
            && self
                .error
                .as_ref()
                .map(|e| e.kind == "UpstreamUnavailable")
                .unwrap_or(false)
    }

    /// Resets a failed job back to `Pending` for a retry attempt,
    /// preserving `attempt`/`created_at`/`idempotency_key`.
    pub fn reset_for_retry(&mut self) {
        self.state = JobState::Pending;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobRecord {
        JobRecord::new("j1", JobKind::Metrics, "match-1", "corr-1", None)
    }

    #[test]
    fn happy_path() {
        let mut j = job();
        j.start().unwrap();
        assert_eq!(j.state, JobState::Running);
        j.complete(serde_json::json!({"ok": true})).unwrap();
        assert!(j.is_terminal());
        assert_eq!(j.progress_pct, 100);
    }

    #[test]
    fn cannot_start_twice() {
        let mut j = job();
        j.start().unwrap();
        assert!(j.start().is_err());
    }

    #[test]
    fn cannot_fail_completed_job() {
        let mut j = job();
        j.start().unwrap();
        j.complete(serde_json::json!({})).unwrap();
        let err = j.fail(JobError { kind: "Internal".into(), message: "x".into() });
        assert!(err.is_err());
    }

    #[test]
    fn cannot_transition_out_of_failed() {
        let mut j = job();
        j.start().unwrap();
        j.fail(JobError { kind: "BadInput".into(), message: "bad".into() }).unwrap();
        assert!(j.complete(serde_json::json!({})).is_err());
        assert!(j.start().is_err());
    }

    #[test]
    fn retryable_classification() {
        let mut j = job();
        j.start().unwrap();
        j.fail(JobError { kind: "UpstreamUnavailable".into(), message: "timeout".into() }).unwrap();
        assert!(j.should_retry());

        let mut j2 = job();
        j2.start().unwrap();
        j2.fail(JobError { kind: "BadInput".into(), message: "bad".into() }).unwrap();
        assert!(!j2.should_retry());
    }

    #[test]
    fn queue_routing() {
        assert_eq!(JobKind::VideoProcessing.queue_name(), "gpu");
        assert_eq!(JobKind::Ingestion.queue_name(), "default");
    }

    #[test]
    fn api_state_maps_cancelled_distinctly_from_failed() {
        let mut j = job();
        j.start().unwrap();
        j.fail(JobError { kind: "Cancelled".into(), message: "cancelled".into() }).unwrap();
        assert_eq!(j.api_state(), ApiJobState::Cancelled);

        let mut j2 = job();
        j2.start().unwrap();
        j2.fail(JobError { kind: "Internal".into(), message: "boom".into() }).unwrap();
        assert_eq!(j2.api_state(), ApiJobState::Failed);
    }
}
