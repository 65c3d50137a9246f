//! Render task processing.
//!
//! One task is one engine run: mark the job running, plan, stream the
//! engine's status lines into job progress, then record the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tracing::debug;

use greenroom_media::{build_plan, DiagnosticTail, EngineProcess, MediaEngine, MediaError, ProgressMonitor};
use greenroom_queue::{JobStore, RenderTask};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics;

/// Runs render tasks against a media engine and records them in the store.
#[derive(Clone)]
pub struct TaskProcessor {
    store: JobStore,
    engine: Arc<dyn MediaEngine>,
    config: WorkerConfig,
}

impl TaskProcessor {
    pub fn new(store: JobStore, engine: Arc<dyn MediaEngine>, config: WorkerConfig) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Render one task. On success the job is completed and the output path
    /// returned; on error the job is left for the caller to fail.
    pub async fn process(&self, task: &RenderTask) -> WorkerResult<PathBuf> {
        let logger = JobLogger::new(&task.job_id, task.mode);
        let mode = task.mode;

        let job = self
            .store
            .update(&task.job_id, |job| {
                job.start(mode);
                job.clone()
            })
            .await?;
        metrics::record_job_started(mode.as_str());

        let plan = build_plan(
            &task.settings,
            &job.source_properties,
            job.background_properties.as_ref(),
            mode,
        )?;
        let output = task.output_path(&plan.output_file_name());
        let command = plan.to_command(&task.source_path, task.background_path.as_deref(), &output)?;

        logger.log_start(&format!(
            "{} {}x{}, expecting {:.2}s",
            plan.format, plan.canvas.width, plan.canvas.height, plan.expected_duration
        ));
        debug!(job_id = %task.job_id, "Command: {}", command);

        let started = Instant::now();
        let EngineProcess { mut lines, exit } = self.engine.start(&command).await?;

        let mut monitor = ProgressMonitor::new(plan.expected_duration);
        let mut tail = DiagnosticTail::new(self.config.diagnostic_lines);
        while let Some(line) = lines.next().await {
            match monitor.observe(&line) {
                Some(progress) => {
                    self.store
                        .update(&task.job_id, |job| job.set_progress(progress))
                        .await?;
                }
                None => tail.push(&line),
            }
        }

        let exit = exit.await?;
        metrics::record_ffmpeg_duration(
            mode.as_str(),
            plan.format.as_str(),
            started.elapsed().as_secs_f64(),
        );

        if !exit.success {
            if let Some(diagnostics) = tail.joined() {
                logger.log_warning(&format!("FFmpeg diagnostics:\n{}", diagnostics));
            }
            return Err(MediaError::exit_status(exit.code, tail.joined()).into());
        }

        self.store
            .update(&task.job_id, |job| job.complete(mode, output.clone()))
            .await?;
        logger.log_completion(&output.display().to_string());

        Ok(output)
    }
}
