//! FFmpeg progress parsing.
//!
//! FFmpeg reports how far it got as `time=HH:MM:SS.CC` (or `out_time=...`
//! with `-progress`). Everything here works on single status lines so the
//! engine behind them can be swapped out in tests.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

static ELAPSED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.(\d{2})").expect("elapsed pattern is valid")
});

/// Shortest expected duration progress is measured against.
pub const MIN_EXPECTED_DURATION: f64 = 1.0;

/// Extract the elapsed output time, in seconds, from one status line.
pub fn parse_elapsed(line: &str) -> Option<f64> {
    let caps = ELAPSED_PATTERN.captures(line)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let hundredths = field(4)?;

    Some(
        f64::from(hours) * 3600.0
            + f64::from(minutes) * 60.0
            + f64::from(seconds)
            + f64::from(hundredths) / 100.0,
    )
}

/// Progress percentage of `elapsed` against `expected`, clamped to 0-100
/// and rounded to two decimals.
pub fn percentage(elapsed: f64, expected: f64) -> f64 {
    let expected = expected.max(MIN_EXPECTED_DURATION);
    let raw = (elapsed / expected * 100.0).clamp(0.0, 100.0);
    (raw * 100.0).round() / 100.0
}

/// Whether the line is one of the `key=value` records of `-progress`.
pub fn is_progress_record(line: &str) -> bool {
    match line.trim().split_once('=') {
        Some((key, _)) => {
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    }
}

/// Turns the status lines of one engine run into monotonic progress.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    expected_duration: f64,
    current: f64,
}

impl ProgressMonitor {
    pub fn new(expected_duration: f64) -> Self {
        Self {
            expected_duration: expected_duration.max(MIN_EXPECTED_DURATION),
            current: 0.0,
        }
    }

    /// Feed one line. Returns the new percentage when it moved forward.
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let elapsed = parse_elapsed(line)?;
        let value = percentage(elapsed, self.expected_duration);
        if value > self.current {
            self.current = value;
            Some(value)
        } else {
            None
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn expected_duration(&self) -> f64 {
        self.expected_duration
    }
}

/// Bounded tail of FFmpeg's own diagnostic output.
#[derive(Debug, Clone)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Keep the line unless it is a progress record or blank.
    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if self.capacity == 0 || line.is_empty() || is_progress_record(line) {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// The retained lines joined with newlines, `None` when nothing was kept.
    pub fn joined(&self) -> Option<String> {
        if self.lines.is_empty() {
            None
        } else {
            Some(self.lines.iter().cloned().collect::<Vec<_>>().join("\n"))
        }
    }
}
