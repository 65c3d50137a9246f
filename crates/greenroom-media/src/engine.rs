//! Media engine abstraction and the FFmpeg process runner.
//!
//! An engine run is a stream of status lines followed by an exit status.
//! The worker and the preview renderer only see [`MediaEngine`], so tests
//! can script runs without FFmpeg installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream};
use futures_util::{FutureExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::progress::DiagnosticTail;

/// Exit status of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineExit {
    pub code: Option<i32>,
    pub success: bool,
}

impl EngineExit {
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            success: code == 0,
        }
    }
}

/// A started engine run.
///
/// Drain `lines` before awaiting `exit`; the engine may block once its
/// status channel fills up.
pub struct EngineProcess {
    pub lines: BoxStream<'static, String>,
    pub exit: BoxFuture<'static, MediaResult<EngineExit>>,
}

/// Something that can execute an FFmpeg-style command.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Start the command.
    async fn start(&self, command: &FfmpegCommand) -> MediaResult<EngineProcess>;
}

/// Runs commands with the FFmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: PathBuf,
}

impl FfmpegEngine {
    /// Resolve `binary` (a name or a path) through PATH.
    pub fn locate(binary: impl AsRef<Path>) -> MediaResult<Self> {
        let binary = which::which(binary.as_ref()).map_err(|_| MediaError::FfmpegNotFound)?;
        Ok(Self { binary })
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn start(&self, command: &FfmpegCommand) -> MediaResult<EngineProcess> {
        let args = command.build_args();
        debug!("Running FFmpeg: {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let reader = BufReader::new(stderr).lines();

        let lines = stream::unfold(reader, |mut reader| async move {
            match reader.next_line().await {
                Ok(Some(line)) => Some((line, reader)),
                Ok(None) => None,
                Err(e) => {
                    warn!("Stopped reading FFmpeg output: {}", e);
                    None
                }
            }
        })
        .boxed();

        let exit = async move {
            let status = child.wait().await?;
            Ok(EngineExit {
                code: status.code(),
                success: status.success(),
            })
        }
        .boxed();

        Ok(EngineProcess { lines, exit })
    }
}

/// Run a command to completion, keeping a bounded diagnostic tail.
///
/// Non-zero exits become [`MediaError::FfmpegFailed`] carrying the tail.
pub async fn execute(
    engine: &dyn MediaEngine,
    command: &FfmpegCommand,
    diagnostic_lines: usize,
) -> MediaResult<()> {
    let EngineProcess { mut lines, exit } = engine.start(command).await?;

    let mut tail = DiagnosticTail::new(diagnostic_lines);
    while let Some(line) = lines.next().await {
        tail.push(&line);
    }

    let exit = exit.await?;
    if exit.success {
        Ok(())
    } else {
        Err(MediaError::exit_status(exit.code, tail.joined()))
    }
}

/// Resolve the FFprobe binary, mainly for startup checks.
pub fn check_ffprobe(binary: impl AsRef<Path>) -> MediaResult<PathBuf> {
    which::which(binary.as_ref()).map_err(|_| MediaError::FfprobeNotFound)
}
