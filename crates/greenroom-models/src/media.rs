//! Probed media properties.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Natural size and length of an uploaded media file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaProperties {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in seconds (0 for still images)
    #[serde(default)]
    pub duration: f64,
}

impl MediaProperties {
    pub fn new(width: u32, height: u32, duration: f64) -> Self {
        Self {
            width,
            height,
            duration,
        }
    }

    /// Properties of a still image.
    pub fn still(width: u32, height: u32) -> Self {
        Self::new(width, height, 0.0)
    }

    /// A zero-length medium is a still image.
    pub fn is_still(&self) -> bool {
        self.duration <= 0.0
    }

    /// Whether the probe produced a usable frame size.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
