//! Worker configuration.

/// Lines of FFmpeg diagnostics kept for the log when a run fails.
pub const DEFAULT_DIAGNOSTIC_LINES: usize = 40;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// FFmpeg binary (name looked up in PATH, or a path)
    pub ffmpeg_bin: String,
    /// FFprobe binary (name looked up in PATH, or a path)
    pub ffprobe_bin: String,
    /// Size of the diagnostic tail logged on failure
    pub diagnostic_lines: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            diagnostic_lines: DEFAULT_DIAGNOSTIC_LINES,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_bin: std::env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".to_string()),
            diagnostic_lines: std::env::var("WORKER_DIAGNOSTIC_LINES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DIAGNOSTIC_LINES),
        }
    }
}
