//! Job records and their lifecycle.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CompositionSettings, MediaProperties};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is safe to use as a directory name.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 64
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What a queued render produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Full-quality render in the requested format
    #[default]
    Export,
    /// Fast low-quality render of the whole composition
    Preview,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Export => "export",
            RenderMode::Preview => "preview",
        }
    }

    pub fn queued_status(&self) -> JobStatus {
        match self {
            RenderMode::Export => JobStatus::Queued,
            RenderMode::Preview => JobStatus::PreviewQueued,
        }
    }

    pub fn processing_status(&self) -> JobStatus {
        match self {
            RenderMode::Export => JobStatus::Processing,
            RenderMode::Preview => JobStatus::PreviewProcessing,
        }
    }

    pub fn completed_status(&self) -> JobStatus {
        match self {
            RenderMode::Export => JobStatus::Completed,
            RenderMode::Preview => JobStatus::PreviewCompleted,
        }
    }

    /// Base name (without extension) of the file this mode writes.
    pub fn output_stem(&self) -> &'static str {
        match self {
            RenderMode::Export => "output",
            RenderMode::Preview => "preview",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Media uploaded, nothing requested yet
    #[default]
    Uploaded,
    /// Export waiting for the worker
    Queued,
    /// Preview render waiting for the worker
    PreviewQueued,
    /// Export running
    Processing,
    /// Preview render running
    PreviewProcessing,
    /// Export finished, output available
    Completed,
    /// Preview render finished, preview available
    PreviewCompleted,
    /// Last run failed
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Queued => "queued",
            JobStatus::PreviewQueued => "preview_queued",
            JobStatus::Processing => "processing",
            JobStatus::PreviewProcessing => "preview_processing",
            JobStatus::Completed => "completed",
            JobStatus::PreviewCompleted => "preview_completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compositing job as held by the job store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Current state
    pub status: JobStatus,

    /// Progress of the current run (0-100)
    pub progress: f64,

    /// Settings of the latest export or preview request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<CompositionSettings>,

    /// Probed source properties
    pub source_properties: MediaProperties,

    /// Probed background properties, when a background was uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_properties: Option<MediaProperties>,

    /// Rendered export (only when completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Rendered preview (only when preview_completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<PathBuf>,

    /// Failure diagnostic (only when failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a freshly uploaded job.
    pub fn new(source_properties: MediaProperties, background_properties: Option<MediaProperties>) -> Self {
        Self::with_id(JobId::new(), source_properties, background_properties)
    }

    /// Create a freshly uploaded job with a caller-chosen id.
    pub fn with_id(
        id: JobId,
        source_properties: MediaProperties,
        background_properties: Option<MediaProperties>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Uploaded,
            progress: 0.0,
            settings: None,
            source_properties,
            background_properties,
            output_path: None,
            preview_path: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach settings for a new run. Results of any previous run are dropped.
    pub fn enqueue(&mut self, settings: CompositionSettings, mode: RenderMode) {
        self.status = mode.queued_status();
        self.progress = 0.0;
        self.settings = Some(settings);
        self.output_path = None;
        self.preview_path = None;
        self.error = None;
        self.touch();
    }

    /// Mark the run as picked up by the worker. A result left behind by an
    /// earlier run of the same job no longer describes this one.
    pub fn start(&mut self, mode: RenderMode) {
        self.status = mode.processing_status();
        self.progress = 0.0;
        self.output_path = None;
        self.preview_path = None;
        self.error = None;
        self.touch();
    }

    /// Record progress of the running render.
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 100.0);
        self.touch();
    }

    /// Mark the run as finished and record where the result was written.
    pub fn complete(&mut self, mode: RenderMode, path: PathBuf) {
        self.status = mode.completed_status();
        self.progress = 100.0;
        self.error = None;
        match mode {
            RenderMode::Export => {
                self.output_path = Some(path);
                self.preview_path = None;
            }
            RenderMode::Preview => {
                self.preview_path = Some(path);
                self.output_path = None;
            }
        }
        self.touch();
    }

    /// Mark the run as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.output_path = None;
        self.preview_path = None;
        self.touch();
    }

    /// The file a successful run produced, if any.
    pub fn result_path(&self) -> Option<&PathBuf> {
        match self.status {
            JobStatus::Completed => self.output_path.as_ref(),
            JobStatus::PreviewCompleted => self.preview_path.as_ref(),
            _ => None,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
