//! Queue and store error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already exists: {0}")]
    JobExists(String),

    #[error("Task queue is closed")]
    QueueClosed,
}

impl QueueError {
    pub fn job_not_found(id: impl ToString) -> Self {
        Self::JobNotFound(id.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::JobNotFound(_))
    }
}
