//! `AnalysisJob`: the AI-analysis-query entity with its own state
//! machine, distinct from the generic job-fabric record in
//! `crate::jobs` (which tracks pipeline-stage dispatch, not analysis
//! queries against a completed match).
//!
//! Grounded on `original_source/.../entities/analysis_job.py`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PitchSenseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub content: String,
    pub tokens_used: u64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub job_id: String,
    pub match_id: String,
    pub query: String,
    pub status: JobStatus,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    pub fn new(job_id: impl Into<String>, match_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            match_id: match_id.into(),
            query: query.into(),
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn start_processing(&mut self) -> Result<()> {
        if self.status != JobStatus::Pending {
            return Err(PitchSenseError::BadInput(format!(
                "cannot start job in {:?} state",
                self.status
            )));
        }
        self.status = JobStatus::Running;
        Ok(())
    }

    pub fn complete(&mut self, result: AnalysisResult) -> Result<()> {
        if self.status != JobStatus::Running {
            return Err(PitchSenseError::BadInput(format!(
                "cannot complete job in {:?} state",
                self.status
            )));
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        if self.status == JobStatus::Completed {
            return Err(PitchSenseError::BadInput("cannot fail a completed job".to_string()));
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut job = AnalysisJob::new("j1", "m1", "how did we press?");
        job.start_processing().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        job.complete(AnalysisResult { content: "...".into(), tokens_used: 10, duration_seconds: 1.2 })
            .unwrap();
        assert!(job.is_terminal());
    }

    #[test]
    fn cannot_start_twice() {
        let mut job = AnalysisJob::new("j1", "m1", "q");
        job.start_processing().unwrap();
        assert!(job.start_processing().is_err());
    }

    #[test]
    fn cannot_fail_completed_job() {
        let mut job = AnalysisJob::new("j1", "m1", "q");
        job.start_processing().unwrap();
        job.complete(AnalysisResult { content: "x".into(), tokens_used: 1, duration_seconds: 0.1 })
            .unwrap();
        assert!(job.fail("oops").is_err());
    }

    #[test]
    fn complete_requires_running_state() {
        let mut job = AnalysisJob::new("j1", "m1", "q");
        assert!(job.complete(AnalysisResult { content: "x".into(), tokens_used: 1, duration_seconds: 0.1 }).is_err());
    }
}
