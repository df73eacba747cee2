//! Closed error taxonomy shared by every engine, store and job-fabric
//! component.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PitchSenseError>;

/// Tagged error kind propagated across the pipeline.
///
/// Non-retryable variants (`BadInput`, `ModelNotTrained`, `Timeout`,
/// `Cancelled`) are surfaced to the caller as-is. `UpstreamUnavailable`
/// is retried by job-fabric workers with exponential backoff up to a
/// job's `max_retries`. `Internal` must be logged with its
/// correlation id before propagating.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PitchSenseError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("model not trained")]
    ModelNotTrained,

    #[error("deadline exceeded")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {message} (correlation_id={correlation_id})")]
    Internal {
        message: String,
        correlation_id: String,
    },
}

impl PitchSenseError {
    /// Whether a job-fabric worker should retry this error with backoff.
    ///
    /// Only transient I/O against external collaborators (artifact
    /// store, broker, adapters) is retryable; everything else is a
    /// terminal classification failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PitchSenseError::UpstreamUnavailable(_))
    }

    pub fn internal(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        PitchSenseError::Internal {
            message: message.into(),
            correlation_id: correlation_id.into(),
        }
    }
}
