//! The job fabric: typed per-stage job records, named dispatch
//! queues, an idempotent result store, retry/backoff, cooperative
//! cancellation and best-effort chaining.

pub mod fabric;
pub mod queue;
pub mod record;
pub mod store;

pub use fabric::{CancellationToken, Dispatch, DispatchOutcome, Execute, JobFabric};
pub use queue::{QueueRegistry, QueueSnapshot, QueuedJob, QUEUE_DEFAULT, QUEUE_GPU};
pub use record::{ApiJobState, JobError, JobKind, JobRecord, JobState};
pub use store::{InMemoryJobStore, JobStore};
