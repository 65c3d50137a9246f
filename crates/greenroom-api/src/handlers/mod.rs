//! HTTP request handlers.

pub mod health;
pub mod jobs;

pub use health::health;
pub use jobs::{download, export, preview, process, status};
