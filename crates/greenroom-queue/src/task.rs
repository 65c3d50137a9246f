//! Render tasks carried by the queue.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use greenroom_models::{CompositionSettings, JobId, RenderMode};
use serde::{Deserialize, Serialize};

/// One export or preview render request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderTask {
    /// Job to render
    pub job_id: JobId,
    /// Uploaded foreground clip
    pub source_path: PathBuf,
    /// Uploaded background, when the composition uses one
    pub background_path: Option<PathBuf>,
    /// Validated settings
    pub settings: CompositionSettings,
    /// Export or preview render
    pub mode: RenderMode,
    /// Directory the result is written to
    pub output_dir: PathBuf,
    /// When the task was queued
    pub created_at: DateTime<Utc>,
}

impl RenderTask {
    /// Create a task that writes next to the source file.
    pub fn new(
        job_id: JobId,
        source_path: impl Into<PathBuf>,
        settings: CompositionSettings,
        mode: RenderMode,
    ) -> Self {
        let source_path = source_path.into();
        let output_dir = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            job_id,
            source_path,
            background_path: None,
            settings,
            mode,
            output_dir,
            created_at: Utc::now(),
        }
    }

    /// Set the background file.
    pub fn with_background(mut self, path: Option<PathBuf>) -> Self {
        self.background_path = path;
        self
    }

    /// Write the result somewhere else.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Full path of the result for a given file name.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
