//! FFprobe media properties.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use greenroom_models::MediaProperties;
use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

use crate::error::{MediaError, MediaResult};

/// Extensions probed for a duration. Anything else is a still image.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Whether the file is handled as a video (has a duration).
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Reads width, height and duration with FFprobe.
#[derive(Debug, Clone)]
pub struct MediaProber {
    binary: PathBuf,
}

impl MediaProber {
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    /// Probe a video or image file.
    pub async fn probe(&self, path: impl AsRef<Path>) -> MediaResult<MediaProperties> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        // Check FFprobe exists
        which::which(&self.binary).map_err(|_| MediaError::FfprobeNotFound)?;

        let video = is_video_path(path);
        let entries = if video {
            "stream=width,height,duration"
        } else {
            "stream=width,height"
        };

        let output = Command::new(&self.binary)
            .args(["-v", "error", "-select_streams", "v:0", "-show_entries", entries, "-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::FfprobeFailed {
                message: format!("FFprobe failed on {}", path.display()),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            });
        }

        let properties = parse_probe_output(&output.stdout, video)?;
        if video && properties.is_still() {
            warn!("FFprobe returned no duration for video {}", path.display());
        }
        Ok(properties)
    }
}

/// Turn FFprobe's JSON into properties.
fn parse_probe_output(stdout: &[u8], video: bool) -> MediaResult<MediaProperties> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::InvalidMedia("No video stream found".to_string()))?;

    let duration = if video {
        stream
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0)
    } else {
        0.0
    };

    Ok(MediaProperties::new(
        stream.width.unwrap_or(0),
        stream.height.unwrap_or(0),
        duration,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_extensions() {
        assert!(is_video_path(Path::new("jobs/a/source_video.MP4")));
        assert!(is_video_path(Path::new("clip.webm")));
        assert!(!is_video_path(Path::new("background.png")));
        assert!(!is_video_path(Path::new("background")));
    }

    #[test]
    fn test_parse_video_output() {
        let json = br#"{"programs":[],"streams":[{"width":1280,"height":720,"duration":"10.010000"}]}"#;
        let props = parse_probe_output(json, true).unwrap();
        assert_eq!(props.width, 1280);
        assert_eq!(props.height, 720);
        assert!((props.duration - 10.01).abs() < 1e-9);
    }

    #[test]
    fn test_parse_image_output() {
        let json = br#"{"streams":[{"width":1920,"height":1080,"duration":"0.040000"}]}"#;
        let props = parse_probe_output(json, false).unwrap();
        assert!(props.is_still());
    }

    #[test]
    fn test_parse_missing_stream() {
        assert!(matches!(
            parse_probe_output(br#"{"streams":[]}"#, true),
            Err(MediaError::InvalidMedia(_))
        ));
        assert!(parse_probe_output(b"not json", true).is_err());
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let prober = MediaProber::new("ffprobe");
        let result = prober.probe("/nonexistent/greenroom/source.mp4").await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
