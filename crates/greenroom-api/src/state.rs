//! Application state.

use std::sync::Arc;

use greenroom_media::{MediaEngine, MediaProber, PreviewRenderer};
use greenroom_queue::{JobStore, TaskQueue};

use crate::config::ApiConfig;
use crate::services::JobService;
use crate::workspace::JobWorkspace;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jobs: JobService,
}

impl AppState {
    /// Wire the job service to an engine, a prober and the worker's queue.
    pub fn new(
        config: ApiConfig,
        store: JobStore,
        queue: TaskQueue,
        engine: Arc<dyn MediaEngine>,
        prober: MediaProber,
        diagnostic_lines: usize,
    ) -> Self {
        let workspace = JobWorkspace::new(config.jobs_dir.clone());
        let previews = PreviewRenderer::new(engine, diagnostic_lines);
        let jobs = JobService::new(store, queue, prober, previews, workspace);
        Self { config, jobs }
    }
}
