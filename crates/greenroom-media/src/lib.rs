//! FFmpeg composition planning and invocation.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building for multi-input filter graphs
//! - The composition plan builder (settings + media properties → directives)
//! - Progress parsing of FFmpeg status lines
//! - A `MediaEngine` seam with the FFmpeg process runner behind it
//! - FFprobe media properties and still-frame preview rendering

pub mod command;
pub mod engine;
pub mod error;
pub mod filters;
pub mod plan;
pub mod preview;
pub mod probe;
pub mod progress;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use command::{FfmpegCommand, Input};
pub use engine::{check_ffprobe, execute, EngineExit, EngineProcess, FfmpegEngine, MediaEngine};
pub use error::{MediaError, MediaResult};
pub use plan::{build_plan, CompositionPlan, Encoder, FrameSize, InputRole, PlannedInput};
pub use preview::{preview_timestamp, PreviewRenderer};
pub use probe::{is_video_path, MediaProber};
pub use progress::{parse_elapsed, percentage, DiagnosticTail, ProgressMonitor};
