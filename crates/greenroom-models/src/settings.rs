//! Composition settings.
//!
//! Every option the client may send is listed here with its default. Settings
//! are validated once when a request arrives; the plan builder never has to
//! guess at missing or malformed values.

use std::borrow::Cow;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default chroma-key colour (pure green).
pub const DEFAULT_KEY_COLOR: &str = "#00FF00";
/// Default chroma-key similarity.
pub const DEFAULT_SIMILARITY: f64 = 0.2;
/// Default chroma-key blend.
pub const DEFAULT_BLEND: f64 = 0.1;

/// Output container/codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// H.264 + AAC in MP4
    #[default]
    Mp4,
    /// VP9 + Opus in WebM
    Webm,
    /// Palette-optimised animated GIF, no audio
    Gif,
    /// ProRes in QuickTime (always used for transparent output)
    Prores,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
            OutputFormat::Prores => "prores",
        }
    }

    /// File extension of the produced container.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
            OutputFormat::Prores => "mov",
        }
    }

    pub fn has_audio(&self) -> bool {
        !matches!(self, OutputFormat::Gif)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Resolution {
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "4k")]
    Uhd4k,
    /// Natural size of the background
    #[serde(rename = "original_background")]
    OriginalBackground,
    /// Natural size of the source
    #[default]
    #[serde(rename = "original_source")]
    OriginalSource,
}

impl Resolution {
    /// Fixed dimensions of a preset, `None` for the media-derived variants.
    pub fn preset_dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Resolution::Hd1080 => Some((1920, 1080)),
            Resolution::Hd720 => Some((1280, 720)),
            Resolution::Uhd4k => Some((3840, 2160)),
            Resolution::OriginalBackground | Resolution::OriginalSource => None,
        }
    }
}

/// Which input repeats until the other one ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    None,
    Source,
    Background,
}

/// Scale and offset of one layer on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct LayerTransform {
    /// Multiplier on the natural size, at most 10x
    #[validate(range(exclusive_min = 0.0, max = 10.0))]
    pub scale: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

impl LayerTransform {
    /// Canvas offset in whole pixels.
    pub fn offset(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

/// Per-layer transforms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Validate, Default)]
#[serde(default)]
pub struct Transforms {
    #[validate(nested)]
    pub foreground: LayerTransform,
    #[validate(nested)]
    pub background: LayerTransform,
}

/// Declarative composition recipe sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "validate_trim_window"))]
pub struct CompositionSettings {
    /// Render with an alpha channel and no background
    pub transparent: bool,

    /// Apply chroma-key to the foreground
    pub is_keying_enabled: bool,

    /// Colour to remove
    #[validate(custom(function = "validate_key_color"))]
    pub key_color: String,

    /// Chroma-key tolerance
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity: f64,

    /// Chroma-key edge feather
    #[validate(range(min = 0.0, max = 1.0))]
    pub blend: f64,

    /// Requested output format (ignored when transparent)
    pub format: OutputFormat,

    /// Target canvas size
    pub resolution: Resolution,

    /// Layer placement
    #[validate(nested)]
    pub transforms: Transforms,

    /// Trim start in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub start_time: Option<f64>,

    /// Trim end in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub end_time: Option<f64>,

    /// Loop behaviour (ignored when transparent)
    #[serde(rename = "loop")]
    pub loop_mode: LoopMode,

    /// Preview only: frame to sample, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub timestamp: Option<f64>,

    /// Preview only: show raw colours while the user picks a key colour
    pub is_previewing_color_pick: bool,
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            transparent: false,
            is_keying_enabled: true,
            key_color: DEFAULT_KEY_COLOR.to_string(),
            similarity: DEFAULT_SIMILARITY,
            blend: DEFAULT_BLEND,
            format: OutputFormat::default(),
            resolution: Resolution::default(),
            transforms: Transforms::default(),
            start_time: None,
            end_time: None,
            loop_mode: LoopMode::default(),
            timestamp: None,
            is_previewing_color_pick: false,
        }
    }
}

impl CompositionSettings {
    /// Validate and hand the settings back.
    pub fn validated(self) -> Result<Self, ValidationErrors> {
        self.validate()?;
        Ok(self)
    }

    /// Loop mode after transparency has been taken into account.
    pub fn effective_loop(&self) -> LoopMode {
        if self.transparent {
            LoopMode::None
        } else {
            self.loop_mode
        }
    }

    /// Output format after transparency has been taken into account.
    pub fn effective_format(&self) -> OutputFormat {
        if self.transparent {
            OutputFormat::Prores
        } else {
            self.format
        }
    }

    /// Length of the trim window, when an end time is set and the window is
    /// not empty. A missing start time counts as 0.
    pub fn trim_duration(&self) -> Option<f64> {
        let end = self.end_time?;
        let duration = end - self.start_time.unwrap_or(0.0);
        (duration > 0.0).then_some(duration)
    }

    /// Key colour in FFmpeg colour syntax (`#RRGGBB` becomes `0xRRGGBB`).
    pub fn engine_key_color(&self) -> String {
        match self.key_color.strip_prefix('#') {
            Some(hex) => format!("0x{}", hex),
            None => self.key_color.clone(),
        }
    }
}

fn validate_key_color(value: &str) -> Result<(), ValidationError> {
    let hex = value
        .strip_prefix('#')
        .or_else(|| value.strip_prefix("0x"))
        .or_else(|| value.strip_prefix("0X"));

    let valid = match hex {
        Some(digits) => {
            matches!(digits.len(), 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        // Named colours ("green", "Lime") are understood by FFmpeg.
        None => !value.is_empty() && value.len() <= 32 && value.chars().all(|c| c.is_ascii_alphabetic()),
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("key_color")
            .with_message(Cow::from("keyColor must be #RRGGBB, 0xRRGGBB or a colour name")))
    }
}

fn validate_trim_window(settings: &CompositionSettings) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (settings.start_time, settings.end_time) {
        if end <= start {
            return Err(ValidationError::new("trim_window")
                .with_message(Cow::from("endTime must be greater than startTime")));
        }
    }
    Ok(())
}
