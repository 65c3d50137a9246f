//! Worker error types.

use thiserror::Error;

use greenroom_media::MediaError;
use greenroom_queue::QueueError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Diagnostic recorded on a job when processing broke for reasons other
/// than the engine itself.
pub const INTERNAL_FAILURE_MESSAGE: &str = "Internal error while processing job.";

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl WorkerError {
    pub fn panicked(msg: impl Into<String>) -> Self {
        Self::Panicked(msg.into())
    }

    /// Diagnostic stored on the failed job.
    ///
    /// Engine failures keep their exit-code message and plan errors their
    /// reason. Everything else is reported generically.
    pub fn job_message(&self) -> String {
        match self {
            WorkerError::Media(e @ MediaError::FfmpegFailed { .. })
            | WorkerError::Media(e @ MediaError::InvalidPlan(_)) => e.public_message(),
            _ => INTERNAL_FAILURE_MESSAGE.to_string(),
        }
    }
}
