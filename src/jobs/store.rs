//! The job store: a `(kind, idempotency_key)`-indexed, single-key
//! transactional map of `JobRecord`s.
//!
//! Transactional at single-key granularity, with compare-and-set on job
//! state. Grounded on the `parking_lot`-guarded shared-state style used
//! throughout `main.rs`/`signals`. A real deployment would back this
//! with a database (see `Config::database_url`); this crate ships only
//! the in-memory implementation required for a single-process
//! deployment, behind a trait so a persistent implementation can be
//! swapped in without touching the fabric.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{PitchSenseError, Result};
use crate::jobs::record::{JobKind, JobRecord, JobState};

/// Storage contract for job records. Implementations must be safe for
/// concurrent readers and serialize writers per key — last write wins
/// on a concurrent update to the same job id.
pub trait JobStore: Send + Sync {
    fn insert(&self, record: JobRecord);
    fn get(&self, job_id: &str) -> Option<JobRecord>;
    /// Looks up an existing, non-terminal-or-completed job id for a
    /// `(kind, idempotency_key)` pair — the at-most-once dispatch
    /// check.
    fn find_by_idempotency_key(&self, kind: JobKind, idempotency_key: &str) -> Option<String>;

    /// Compare-and-set: applies `f` to the stored record only if its
    /// current state equals `expected`, returning the mutated record.
    ///
    /// Boxed rather than generic so the trait stays object-safe — the
    /// fabric holds its store behind `Arc<dyn JobStore>`.
    fn compare_and_update(
        &self,
        job_id: &str,
        expected: JobState,
        f: Box<dyn FnOnce(&mut JobRecord) -> Result<()> + '_>,
    ) -> Result<JobRecord>;
}

#[derive(Default)]
pub struct InMemoryJobStore {
    records: RwLock<HashMap<String, JobRecord>>,
    idempotency_index: RwLock<HashMap<(JobKind, String), String>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, record: JobRecord) {
        let key = (record.kind, record.idempotency_key.clone());
        self.idempotency_index.write().insert(key, record.job_id.clone());
        self.records.write().insert(record.job_id.clone(), record);
    }

    fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.records.read().get(job_id).cloned()
    }

    fn find_by_idempotency_key(&self, kind: JobKind, idempotency_key: &str) -> Option<String> {
        let job_id = self
            .idempotency_index
            .read()
            .get(&(kind, idempotency_key.to_string()))
            .cloned()?;
        // A completed job's key stays claimed too (at-most-once
        // *result*, not just at-most-once in-flight run): re-dispatch
        // before OR after completion returns the same job id.
        self.records.read().contains_key(&job_id).then_some(job_id)
    }

    fn compare_and_update(
        &self,
        job_id: &str,
        expected: JobState,
        f: Box<dyn FnOnce(&mut JobRecord) -> Result<()> + '_>,
    ) -> Result<JobRecord> {
        let mut records = self.records.write();
        let record = records
            .get_mut(job_id)
            .ok_or_else(|| PitchSenseError::NotFound(format!("job {job_id}")))?;
        if record.state != expected {
            return Err(PitchSenseError::BadInput(format!(
                "job {job_id} expected state {expected:?}, found {:?}",
                record.state
            )));
        }
        f(record)?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::record::JobError;

    #[test]
    fn idempotent_lookup_before_and_after_completion() {
        let store = InMemoryJobStore::new();
        let record = JobRecord::new("j1", JobKind::Metrics, "match-1", "corr-1", None);
        store.insert(record);

        assert_eq!(
            store.find_by_idempotency_key(JobKind::Metrics, "match-1"),
            Some("j1".to_string())
        );

        store
            .compare_and_update("j1", JobState::Pending, Box::new(|r| r.start()))
            .unwrap();
        store
            .compare_and_update("j1", JobState::Running, Box::new(|r| r.complete(serde_json::json!({}))))
            .unwrap();

        assert_eq!(
            store.find_by_idempotency_key(JobKind::Metrics, "match-1"),
            Some("j1".to_string())
        );
    }

    #[test]
    fn compare_and_update_rejects_mismatched_expected_state() {
        let store = InMemoryJobStore::new();
        store.insert(JobRecord::new("j1", JobKind::Metrics, "match-1", "corr-1", None));
        let err = store.compare_and_update("j1", JobState::Running, Box::new(|r| r.start()));
        assert!(err.is_err());
    }

    #[test]
    fn different_idempotency_keys_get_distinct_jobs() {
        let store = InMemoryJobStore::new();
        store.insert(JobRecord::new("j1", JobKind::Metrics, "match-1", "corr-1", None));
        store.insert(JobRecord::new("j2", JobKind::Metrics, "match-2", "corr-2", None));
        assert_ne!(
            store.find_by_idempotency_key(JobKind::Metrics, "match-1"),
            store.find_by_idempotency_key(JobKind::Metrics, "match-2"),
        );
    }

    #[test]
    fn fail_then_retry_transition_sequence() {
        let store = InMemoryJobStore::new();
        store.insert(JobRecord::new("j1", JobKind::Calibration, "vid-1", "corr-1", None));
        store.compare_and_update("j1", JobState::Pending, Box::new(|r| r.start())).unwrap();
        store
            .compare_and_update(
                "j1",
                JobState::Running,
                Box::new(|r| r.fail(JobError { kind: "UpstreamUnavailable".into(), message: "io".into() })),
            )
            .unwrap();
        let record = store.get("j1").unwrap();
        assert!(record.should_retry());
    }
}
