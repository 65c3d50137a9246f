//! In-memory job store and render task queue.
//!
//! This crate provides:
//! - `JobStore`, the shared job registry (one lock, copy in/copy out)
//! - `RenderTask`, the unit of work handed to the worker
//! - An unbounded FIFO task queue with a single consumer

pub mod error;
pub mod queue;
pub mod store;
pub mod task;

pub use error::{QueueError, QueueResult};
pub use queue::{task_queue, TaskQueue, TaskReceiver};
pub use store::JobStore;
pub use task::RenderTask;
