//! Structured job logging utilities.

use tracing::{error, info, warn, Span};

use greenroom_models::{JobId, RenderMode};

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    mode: RenderMode,
}

impl JobLogger {
    /// Create a new job logger for a job and render mode.
    pub fn new(job_id: &JobId, mode: RenderMode) -> Self {
        Self {
            job_id: job_id.to_string(),
            mode,
        }
    }

    /// Log the start of a render.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            mode = %self.mode,
            "Job started: {}", message
        );
    }

    /// Log a warning during the render.
    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            mode = %self.mode,
            "Job warning: {}", message
        );
    }

    /// Log an error during the render.
    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            mode = %self.mode,
            "Job error: {}", message
        );
    }

    /// Log the completion of a render.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            mode = %self.mode,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            mode = %self.mode
        )
    }
}
