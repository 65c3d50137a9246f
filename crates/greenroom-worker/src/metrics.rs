//! Worker metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder that exposes them.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const QUEUE_DEPTH: &str = "greenroom_queue_depth";
    pub const JOBS_STARTED_TOTAL: &str = "greenroom_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "greenroom_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "greenroom_jobs_failed_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "greenroom_ffmpeg_duration_seconds";
}

/// Update queue depth gauge.
pub fn set_queue_depth(depth: usize) {
    gauge!(names::QUEUE_DEPTH).set(depth as f64);
}

/// Record a task picked up by the worker.
pub fn record_job_started(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::JOBS_STARTED_TOTAL, &labels).increment(1);
}

/// Record job completed.
pub fn record_job_completed(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record job failed.
pub fn record_job_failed(mode: &str, reason: &str) {
    let labels = [("mode", mode.to_string()), ("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record FFmpeg run duration.
pub fn record_ffmpeg_duration(mode: &str, format: &str, duration_secs: f64) {
    let labels = [("mode", mode.to_string()), ("format", format.to_string())];
    histogram!(names::FFMPEG_DURATION_SECONDS, &labels).record(duration_secs);
}
