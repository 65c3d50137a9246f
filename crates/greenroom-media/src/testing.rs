//! Scripted media engine for tests.
//!
//! Each `start` consumes the next queued [`ScriptedRun`] (or repeats the
//! default one), records the command and, when asked, writes a fake output
//! file so callers that read their result back keep working.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use futures_util::{FutureExt, StreamExt};

use crate::command::FfmpegCommand;
use crate::engine::{EngineExit, EngineProcess, MediaEngine};
use crate::error::MediaResult;

/// One scripted engine run.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub lines: Vec<String>,
    pub exit_code: i32,
    pub output: Option<Vec<u8>>,
    pub delay: Option<Duration>,
    /// Write the command line instead of `output`
    pub echo: bool,
    pub panic: bool,
}

impl ScriptedRun {
    /// Exit 0 and write a placeholder output file.
    pub fn success() -> Self {
        Self {
            lines: Vec::new(),
            exit_code: 0,
            output: Some(b"greenroom".to_vec()),
            delay: None,
            echo: false,
            panic: false,
        }
    }

    /// Exit with `code` and write nothing.
    pub fn failure(code: i32) -> Self {
        Self {
            exit_code: code,
            output: None,
            ..Self::success()
        }
    }

    /// Panic inside `start`.
    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::success()
        }
    }

    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output(mut self, bytes: Vec<u8>) -> Self {
        self.output = Some(bytes);
        self
    }

    /// Write the command line as the output file.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Hold the exit back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Media engine that replays scripted runs.
#[derive(Debug)]
pub struct ScriptedEngine {
    default_run: ScriptedRun,
    queued: Mutex<VecDeque<ScriptedRun>>,
    commands: Mutex<Vec<FfmpegCommand>>,
}

impl ScriptedEngine {
    pub fn new(default_run: ScriptedRun) -> Self {
        Self {
            default_run,
            queued: Mutex::new(VecDeque::new()),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Queue a run to be used before falling back to the default.
    pub fn push(&self, run: ScriptedRun) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(run);
        }
    }

    /// Commands started so far, in order.
    pub fn commands(&self) -> Vec<FfmpegCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn next_run(&self) -> ScriptedRun {
        self.queued
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.default_run.clone())
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    async fn start(&self, command: &FfmpegCommand) -> MediaResult<EngineProcess> {
        let run = self.next_run();
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }

        if run.panic {
            panic!("scripted engine panic");
        }

        if run.echo {
            tokio::fs::write(command.output_path(), command.to_string()).await?;
        } else if let Some(bytes) = &run.output {
            tokio::fs::write(command.output_path(), bytes).await?;
        }

        let exit = EngineExit::from_code(run.exit_code);
        let delay = run.delay;
        Ok(EngineProcess {
            lines: stream::iter(run.lines).boxed(),
            exit: async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(exit)
            }
            .boxed(),
        })
    }
}
