//! Shared data models for the Greenroom compositing service.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job identifiers and lifecycle states
//! - Probed media properties
//! - Composition settings with their defaults and validation rules
//! - Preview session message schemas

pub mod job;
pub mod media;
pub mod settings;
pub mod ws;

// Re-export common types
pub use job::{Job, JobId, JobStatus, RenderMode};
pub use media::MediaProperties;
pub use settings::{
    CompositionSettings, LayerTransform, LoopMode, OutputFormat, Resolution, Transforms,
    DEFAULT_KEY_COLOR,
};
pub use ws::{PreviewRequest, PreviewResponse, PreviewResponseType};
