//! Render task queue.
//!
//! FIFO and unbounded. Any number of producers, one consumer: the receiving
//! half is handed to exactly one worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{QueueError, QueueResult};
use crate::task::RenderTask;

/// Create a connected queue/receiver pair.
pub fn task_queue() -> (TaskQueue, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        TaskQueue {
            tx,
            depth: depth.clone(),
        },
        TaskReceiver { rx, depth },
    )
}

/// Producer handle.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<RenderTask>,
    depth: Arc<AtomicUsize>,
}

impl TaskQueue {
    /// Append a task.
    pub fn enqueue(&self, task: RenderTask) -> QueueResult<()> {
        let job_id = task.job_id.clone();
        let mode = task.mode;
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::QueueClosed);
        }
        debug!(job_id = %job_id, mode = %mode, "Enqueued render task");
        Ok(())
    }

    /// Tasks waiting to be picked up.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle.
#[derive(Debug)]
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<RenderTask>,
    depth: Arc<AtomicUsize>,
}

impl TaskReceiver {
    /// Next task, `None` once every producer is gone and the queue drained.
    pub async fn recv(&mut self) -> Option<RenderTask> {
        let task = self.rx.recv().await;
        if task.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        task
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}
