//! Still-frame previews.
//!
//! A preview is two short engine runs: grab one frame of the source, then
//! scale and key it into a PNG. Every render works in its own temporary
//! directory so concurrent previews of one job never share files.

use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use greenroom_models::{CompositionSettings, MediaProperties};
use tracing::debug;

use crate::command::{FfmpegCommand, Input};
use crate::engine::{execute, MediaEngine};
use crate::error::{MediaError, MediaResult};
use crate::filters;
use crate::plan::layer_size;

const FRAME_FILE: &str = "preview_base.png";
const KEYED_FILE: &str = "preview_keyed.png";

/// Frame to sample: the requested timestamp, else 10% into clips longer
/// than a second (at least 1s in), else the first frame.
pub fn preview_timestamp(settings: &CompositionSettings, source: &MediaProperties) -> f64 {
    match settings.timestamp {
        Some(ts) => ts,
        None if source.duration > 1.0 => (source.duration * 0.1).max(1.0),
        None => 0.0,
    }
}

/// `-ss T -i source -vframes 1 frame.png`
pub fn extract_frame_command(source_path: &Path, timestamp: f64, frame_path: &Path) -> FfmpegCommand {
    FfmpegCommand::new(frame_path)
        .input(Input::new(source_path).seek(timestamp))
        .single_frame()
        .without_progress()
}

/// Filter chain applied to the extracted frame.
pub fn key_filter(settings: &CompositionSettings, source: &MediaProperties) -> String {
    let size = layer_size(source, &settings.transforms.foreground);
    let mut parts = vec![format!("{}{}", filters::video_stream(0), filters::scale(size))];

    if settings.is_keying_enabled && !settings.is_previewing_color_pick {
        parts.push(filters::chromakey(
            &settings.engine_key_color(),
            settings.similarity,
            settings.blend,
        ));
    }

    parts.push("format=yuva444p".to_string());
    format!("{}[out]", parts.join(","))
}

/// Scale and key the extracted frame into a PNG.
pub fn key_frame_command(
    settings: &CompositionSettings,
    source: &MediaProperties,
    frame_path: &Path,
    output_path: &Path,
) -> FfmpegCommand {
    FfmpegCommand::new(output_path)
        .input(Input::new(frame_path))
        .filter_complex(key_filter(settings, source))
        .map("[out]")
        .single_frame()
        .without_progress()
}

/// PNG bytes as a `data:` URI.
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

/// Renders preview stills through a media engine.
#[derive(Clone)]
pub struct PreviewRenderer {
    engine: Arc<dyn MediaEngine>,
    diagnostic_lines: usize,
}

impl PreviewRenderer {
    pub fn new(engine: Arc<dyn MediaEngine>, diagnostic_lines: usize) -> Self {
        Self {
            engine,
            diagnostic_lines,
        }
    }

    /// Render one composited still and return it as a PNG data URI.
    pub async fn render(
        &self,
        source_path: &Path,
        source: &MediaProperties,
        settings: &CompositionSettings,
    ) -> MediaResult<String> {
        if !source_path.exists() {
            return Err(MediaError::FileNotFound(source_path.to_path_buf()));
        }

        let mut scratch = tempfile::Builder::new();
        scratch.prefix("preview-");
        let scratch = match source_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => scratch.tempdir_in(dir)?,
            _ => scratch.tempdir()?,
        };

        let frame_path = scratch.path().join(FRAME_FILE);
        let keyed_path = scratch.path().join(KEYED_FILE);
        let timestamp = preview_timestamp(settings, source);
        debug!(
            timestamp,
            scratch = %scratch.path().display(),
            "Rendering preview frame"
        );

        let extract = extract_frame_command(source_path, timestamp, &frame_path);
        execute(self.engine.as_ref(), &extract, self.diagnostic_lines).await?;

        let key = key_frame_command(settings, source, &frame_path, &keyed_path);
        execute(self.engine.as_ref(), &key, self.diagnostic_lines).await?;

        let bytes = tokio::fs::read(&keyed_path).await?;
        Ok(png_data_uri(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedEngine, ScriptedRun};

    fn source() -> MediaProperties {
        MediaProperties::new(1280, 720, 20.0)
    }

    #[test]
    fn test_preview_timestamp() {
        let mut settings = CompositionSettings::default();
        assert_eq!(preview_timestamp(&settings, &source()), 2.0);
        assert_eq!(preview_timestamp(&settings, &MediaProperties::new(640, 360, 5.0)), 1.0);
        assert_eq!(preview_timestamp(&settings, &MediaProperties::new(640, 360, 0.8)), 0.0);

        settings.timestamp = Some(7.5);
        assert_eq!(preview_timestamp(&settings, &source()), 7.5);
    }

    #[test]
    fn test_key_filter() {
        let mut settings = CompositionSettings::default();
        settings.transforms.foreground.scale = 0.5;
        assert_eq!(
            key_filter(&settings, &source()),
            "[0:v]scale=640:360,chromakey=color=0x00FF00:similarity=0.2:blend=0.1,format=yuva444p[out]"
        );

        settings.is_previewing_color_pick = true;
        assert_eq!(
            key_filter(&settings, &source()),
            "[0:v]scale=640:360,format=yuva444p[out]"
        );
    }

    #[test]
    fn test_extract_command() {
        let args = extract_frame_command(Path::new("src.mp4"), 2.0, Path::new("base.png")).build_args();
        assert_eq!(
            args,
            vec!["-y", "-v", "error", "-ss", "2.000", "-i", "src.mp4", "-vframes", "1", "base.png"]
        );
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(png_data_uri(b"png"), "data:image/png;base64,cG5n");
    }

    #[tokio::test]
    async fn test_render_uses_private_scratch_dirs() {
        let job_dir = tempfile::tempdir().unwrap();
        let source_path = job_dir.path().join("source_video.mp4");
        std::fs::write(&source_path, b"video").unwrap();

        let engine = Arc::new(ScriptedEngine::new(ScriptedRun::success().with_output(b"png".to_vec())));
        let renderer = PreviewRenderer::new(engine.clone(), 10);

        let first = renderer
            .render(&source_path, &source(), &CompositionSettings::default())
            .await
            .unwrap();
        let second = renderer
            .render(
                &source_path,
                &source(),
                &CompositionSettings {
                    is_keying_enabled: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first, "data:image/png;base64,cG5n");
        assert_eq!(second, first);

        let commands = engine.commands();
        assert_eq!(commands.len(), 4);
        assert_ne!(
            commands[1].output_path().parent(),
            commands[3].output_path().parent()
        );
        assert!(commands[1].filter_graph().unwrap().contains("chromakey"));
        assert!(!commands[3].filter_graph().unwrap().contains("chromakey"));

        // Scratch directories are gone once the render returns.
        let leftovers: Vec<_> = std::fs::read_dir(job_dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("preview-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_renders_stay_apart() {
        let job_dir = tempfile::tempdir().unwrap();
        let source_path = job_dir.path().join("source_video.mp4");
        std::fs::write(&source_path, b"video").unwrap();

        let run = ScriptedRun::success()
            .echoing()
            .with_delay(std::time::Duration::from_millis(50));
        let engine = Arc::new(ScriptedEngine::new(run));
        let renderer = PreviewRenderer::new(engine.clone(), 10);

        let keyed = CompositionSettings {
            key_color: "#0000FF".to_string(),
            ..Default::default()
        };
        let unkeyed = CompositionSettings {
            is_keying_enabled: false,
            ..Default::default()
        };
        let first_source = source();
        let second_source = source();
        let (first, second) = tokio::join!(
            renderer.render(&source_path, &first_source, &keyed),
            renderer.render(&source_path, &second_source, &unkeyed),
        );

        let decode = |uri: String| {
            let encoded = uri.strip_prefix("data:image/png;base64,").unwrap().to_string();
            String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap()
        };
        let first = decode(first.unwrap());
        let second = decode(second.unwrap());
        assert!(first.contains("chromakey=color=0x0000FF"));
        assert!(!second.contains("chromakey"));

        // Both frame grabs were in flight before either key step started.
        let commands = engine.commands();
        assert_eq!(commands.len(), 4);
        assert!(commands[0].filter_graph().is_none());
        assert!(commands[1].filter_graph().is_none());

        let scratch_dirs: std::collections::HashSet<_> = commands
            .iter()
            .filter_map(|c| c.output_path().parent().map(Path::to_path_buf))
            .collect();
        assert_eq!(scratch_dirs.len(), 2);
        for dir in &scratch_dirs {
            let dir = dir.to_string_lossy();
            assert_ne!(first.contains(&*dir), second.contains(&*dir));
        }
    }

    #[tokio::test]
    async fn test_render_failure() {
        let job_dir = tempfile::tempdir().unwrap();
        let source_path = job_dir.path().join("source_video.mp4");
        std::fs::write(&source_path, b"video").unwrap();

        let engine = Arc::new(ScriptedEngine::new(ScriptedRun::failure(1)));
        let renderer = PreviewRenderer::new(engine, 10);
        let result = renderer
            .render(&source_path, &source(), &CompositionSettings::default())
            .await;
        assert!(matches!(result, Err(MediaError::FfmpegFailed { .. })));
    }

    #[tokio::test]
    async fn test_render_missing_source() {
        let engine = Arc::new(ScriptedEngine::new(ScriptedRun::success()));
        let renderer = PreviewRenderer::new(engine, 10);
        let result = renderer
            .render(Path::new("/nonexistent/source.mp4"), &source(), &CompositionSettings::default())
            .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
