//! Render worker.
//!
//! Exactly one worker consumes the task queue, one task at a time. Each task
//! runs on its own tokio task so a panic only takes that task down; the job
//! is marked failed and the loop moves on.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

use greenroom_queue::{RenderTask, TaskReceiver};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::processor::TaskProcessor;

/// Single consumer of the render task queue.
pub struct Worker {
    processor: Arc<TaskProcessor>,
    receiver: TaskReceiver,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Worker {
    pub fn new(processor: TaskProcessor, receiver: TaskReceiver) -> Self {
        Self {
            processor: Arc::new(processor),
            receiver,
            shutdown: None,
        }
    }

    /// Stop once `true` is sent on this channel. The running task finishes first.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Consume tasks until the queue closes or shutdown is requested.
    pub async fn run(mut self) {
        info!("Render worker started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => {
                    info!("Shutdown signal received, stopping worker");
                    break;
                }
                task = self.receiver.recv() => match task {
                    Some(task) => {
                        metrics::set_queue_depth(self.receiver.depth());
                        self.execute(task).await;
                    }
                    None => {
                        info!("Task queue closed, stopping worker");
                        break;
                    }
                },
            }
        }

        info!("Render worker stopped");
    }

    /// Run one task in isolation and record failures on the job.
    async fn execute(&self, task: RenderTask) {
        let logger = JobLogger::new(&task.job_id, task.mode);
        let processor = Arc::clone(&self.processor);
        let span = logger.create_span();

        let job_id = task.job_id.clone();
        let mode = task.mode;
        let handle = tokio::spawn(async move { processor.process(&task).await }.instrument(span));

        let result: WorkerResult<_> = match handle.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                Err(WorkerError::panicked(panic_message(join_error.into_panic())))
            }
            Err(join_error) => Err(WorkerError::panicked(join_error.to_string())),
        };

        match result {
            Ok(_) => metrics::record_job_completed(mode.as_str()),
            Err(e) => {
                logger.log_error(&e.to_string());
                let reason = match &e {
                    WorkerError::Panicked(_) => "panic",
                    WorkerError::Media(_) => "media",
                    _ => "internal",
                };
                metrics::record_job_failed(mode.as_str(), reason);

                let message = e.job_message();
                if let Err(store_err) = self
                    .processor
                    .store()
                    .update(&job_id, |job| job.fail(message))
                    .await
                {
                    warn!(job_id = %job_id, "Could not record failure: {}", store_err);
                }
            }
        }
    }
}

async fn shutdown_requested(shutdown: &mut Option<watch::Receiver<bool>>) {
    match shutdown {
        Some(rx) => {
            if rx.wait_for(|stop| *stop).await.is_err() {
                // Sender gone without asking to stop: keep serving the queue.
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        error!("Render task panicked with a non-string payload");
        "unknown panic".to_string()
    }
}
