//! Render worker.
//!
//! This crate provides:
//! - The single-consumer worker loop with panic isolation
//! - Task processing: plan, run the engine, stream progress into the store
//! - Job-scoped logging and worker metrics
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult, INTERNAL_FAILURE_MESSAGE};
pub use executor::Worker;
pub use logging::JobLogger;
pub use processor::TaskProcessor;
