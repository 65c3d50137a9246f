//! Composition plan builder.
//!
//! [`build_plan`] compiles validated settings plus probed media properties
//! into everything an FFmpeg invocation needs: input options, the filter
//! graph, stream maps, encoder arguments and output metadata. It touches no
//! files; [`CompositionPlan::to_command`] binds the plan to real paths.

use std::path::Path;

use greenroom_models::{
    CompositionSettings, LayerTransform, LoopMode, MediaProperties, OutputFormat, RenderMode,
    Resolution,
};

use crate::command::{FfmpegCommand, Input};
use crate::error::{MediaError, MediaResult};
use crate::filters;
use crate::progress::MIN_EXPECTED_DURATION;

/// Canvas used when nothing else tells us the size.
pub const FALLBACK_CANVAS: FrameSize = FrameSize {
    width: 1280,
    height: 720,
};

const FOREGROUND_LABEL: &str = "fg_processed";
const BACKGROUND_LABEL: &str = "bg_scaled";
const CANVAS_LABEL: &str = "canvas";
const PLACED_LABEL: &str = "bg_placed";
const TRANSPARENT_BASE_LABEL: &str = "base";
const OUTPUT_LABEL: &str = "outv";
const GIF_LABEL: &str = "outgif";

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Natural media size rounded up to even dimensions.
    pub fn even(width: u32, height: u32) -> Self {
        Self {
            width: round_up_even(width),
            height: round_up_even(height),
        }
    }

    /// Layer size after scaling: each side rounded, bumped to even, at least 2.
    pub fn scaled(width: u32, height: u32, scale: f64) -> Self {
        Self {
            width: scaled_side(width, scale),
            height: scaled_side(height, scale),
        }
    }

    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }
}

fn round_up_even(value: u32) -> u32 {
    let value = value.max(2);
    value + value % 2
}

fn scaled_side(natural: u32, scale: f64) -> u32 {
    let scaled = (f64::from(natural) * scale).round();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        scaled.min(f64::from(u32::MAX - 1)) as u32
    } else {
        0
    };
    round_up_even(scaled)
}

/// Which uploaded file an input reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    Source,
    Background,
}

/// One planned input: its role and how it is read.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedInput {
    pub role: InputRole,
    pub seek: Option<f64>,
    pub stream_loop: bool,
    pub loop_still: bool,
}

impl PlannedInput {
    fn new(role: InputRole) -> Self {
        Self {
            role,
            seek: None,
            stream_loop: false,
            loop_still: false,
        }
    }

    /// The `-i` input for `path`, options in FFmpeg order.
    pub fn bind(&self, path: impl AsRef<Path>) -> Input {
        let mut input = Input::new(path);
        if self.loop_still {
            input = input.loop_still();
        }
        if let Some(start) = self.seek {
            input = input.seek(start);
        }
        if self.stream_loop {
            input = input.stream_loop();
        }
        input
    }

    /// Options placed before `-i`.
    pub fn options(&self) -> Vec<String> {
        self.bind("").options
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options().iter().any(|o| o == option)
    }
}

/// Codec settings for one output profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encoder {
    pub video_codec: Option<&'static str>,
    pub preset: Option<&'static str>,
    pub crf: Option<u8>,
    /// Codec-specific video options, e.g. `-pix_fmt`
    pub video_options: &'static [&'static str],
    pub audio_codec: Option<&'static str>,
    pub audio_bitrate: Option<&'static str>,
}

impl Encoder {
    const NONE: Encoder = Encoder {
        video_codec: None,
        preset: None,
        crf: None,
        video_options: &[],
        audio_codec: None,
        audio_bitrate: None,
    };

    /// Pick the profile for a mode and output format.
    pub fn select(mode: RenderMode, format: OutputFormat, transparent: bool) -> Self {
        match (mode, format) {
            (RenderMode::Preview, _) => Encoder {
                video_codec: Some("libx264"),
                preset: Some("ultrafast"),
                crf: Some(35),
                video_options: &["-pix_fmt", "yuv420p"],
                audio_codec: Some("aac"),
                ..Self::NONE
            },
            (RenderMode::Export, OutputFormat::Prores) if transparent => Encoder {
                video_codec: Some("prores_ks"),
                video_options: &["-profile:v", "4", "-pix_fmt", "yuva444p"],
                audio_codec: Some("pcm_s16le"),
                ..Self::NONE
            },
            (RenderMode::Export, OutputFormat::Prores) => Encoder {
                video_codec: Some("prores_ks"),
                video_options: &["-profile:v", "3"],
                audio_codec: Some("pcm_s16le"),
                ..Self::NONE
            },
            (RenderMode::Export, OutputFormat::Webm) => Encoder {
                video_codec: Some("libvpx-vp9"),
                crf: Some(30),
                video_options: &["-b:v", "0"],
                audio_codec: Some("libopus"),
                ..Self::NONE
            },
            (RenderMode::Export, OutputFormat::Gif) => Self::NONE,
            (RenderMode::Export, OutputFormat::Mp4) => Encoder {
                video_codec: Some("libx264"),
                preset: Some("medium"),
                crf: Some(23),
                audio_codec: Some("aac"),
                audio_bitrate: Some("192k"),
                ..Self::NONE
            },
        }
    }

    pub fn apply(&self, mut command: FfmpegCommand) -> FfmpegCommand {
        if let Some(codec) = self.video_codec {
            command = command.video_codec(codec);
        }
        if let Some(preset) = self.preset {
            command = command.preset(preset);
        }
        if let Some(crf) = self.crf {
            command = command.crf(crf);
        }
        for option in self.video_options {
            command = command.output_arg(*option);
        }
        if let Some(codec) = self.audio_codec {
            command = command.audio_codec(codec);
        }
        if let Some(bitrate) = self.audio_bitrate {
            command = command.audio_bitrate(bitrate);
        }
        command
    }
}

/// Ordered processing directives plus output metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub mode: RenderMode,
    /// Inputs in FFmpeg index order
    pub inputs: Vec<PlannedInput>,
    /// Filter graph statements, joined with `;`
    pub filters: Vec<String>,
    pub video_map: String,
    /// `None` when the output carries no audio
    pub audio_map: Option<String>,
    pub encoder: Encoder,
    /// Format actually produced
    pub format: OutputFormat,
    pub extension: &'static str,
    /// Length of the output when it is bounded explicitly
    pub output_duration: Option<f64>,
    /// Duration progress is measured against
    pub expected_duration: f64,
    pub canvas: FrameSize,
    pub foreground: FrameSize,
    pub background: Option<FrameSize>,
}

impl CompositionPlan {
    pub fn filter_graph(&self) -> String {
        self.filters.join(";")
    }

    pub fn has_chroma_key(&self) -> bool {
        self.filters.iter().any(|f| f.contains("chromakey="))
    }

    pub fn has_background(&self) -> bool {
        self.input(InputRole::Background).is_some()
    }

    pub fn input(&self, role: InputRole) -> Option<&PlannedInput> {
        self.inputs.iter().find(|i| i.role == role)
    }

    /// Overlay statements in graph order.
    pub fn overlays(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| f.contains("overlay="))
            .map(String::as_str)
            .collect()
    }

    /// Arguments placed after the stream maps.
    pub fn output_args(&self) -> Vec<String> {
        self.apply_output(FfmpegCommand::new(""))
            .output_options()
            .to_vec()
    }

    fn apply_output(&self, mut command: FfmpegCommand) -> FfmpegCommand {
        if let Some(duration) = self.output_duration {
            command = command.duration(duration);
        }
        self.encoder.apply(command)
    }

    /// File name the render is written to, e.g. `output.mov`.
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.mode.output_stem(), self.extension)
    }

    /// Bind the plan to files on disk.
    pub fn to_command(
        &self,
        source: &Path,
        background: Option<&Path>,
        output: &Path,
    ) -> MediaResult<FfmpegCommand> {
        let mut command = FfmpegCommand::new(output);

        for planned in &self.inputs {
            let path = match planned.role {
                InputRole::Source => source,
                InputRole::Background => background
                    .ok_or_else(|| MediaError::invalid_plan("Background file is missing."))?,
            };
            command = command.input(planned.bind(path));
        }

        command = command
            .filter_complex(self.filter_graph())
            .map(self.video_map.clone());
        if let Some(audio) = &self.audio_map {
            command = command.map(audio.clone());
        }

        Ok(self.apply_output(command))
    }
}

/// Compile settings into a plan.
///
/// Fails only when an opaque composition has no background to draw on.
pub fn build_plan(
    settings: &CompositionSettings,
    source: &MediaProperties,
    background: Option<&MediaProperties>,
    mode: RenderMode,
) -> MediaResult<CompositionPlan> {
    let transparent = settings.transparent;
    let backdrop = match (transparent, background) {
        (true, _) => None,
        (false, Some(bg)) => Some(bg),
        (false, None) => {
            return Err(MediaError::invalid_plan(
                "A background is required unless the composition is transparent.",
            ))
        }
    };

    let canvas = canvas_size(settings.resolution, source, background);
    let foreground = layer_size(source, &settings.transforms.foreground);
    let trim = settings.trim_duration();
    let loop_mode = settings.effective_loop();
    let seek = settings.start_time.filter(|s| *s > 0.0);

    let mut source_input = PlannedInput::new(InputRole::Source);
    source_input.seek = seek;
    source_input.stream_loop = loop_mode == LoopMode::Source;

    let mut inputs = Vec::new();
    let mut filters = Vec::new();
    let mut background_size = None;
    let mut output_duration = trim;

    let audio_index = match backdrop {
        None => {
            inputs.push(source_input);

            filters.push(foreground_chain(settings, 0, foreground));
            filters.push(format!(
                "{}[{}]",
                filters::transparent_canvas(canvas),
                TRANSPARENT_BASE_LABEL
            ));
            filters.push(filters::overlay(
                TRANSPARENT_BASE_LABEL,
                FOREGROUND_LABEL,
                settings.transforms.foreground.offset(),
                trim.is_none(),
                OUTPUT_LABEL,
            ));
            0
        }
        Some(background) => {
            let size = layer_size(background, &settings.transforms.background);
            background_size = Some(size);

            let mut background_input = PlannedInput::new(InputRole::Background);
            if background.is_still() {
                background_input.loop_still = true;
            } else {
                background_input.seek = seek;
                background_input.stream_loop = loop_mode == LoopMode::Background;
            }

            // A looping source over a still background never ends by itself.
            if trim.is_none()
                && loop_mode == LoopMode::Source
                && background.is_still()
                && source.duration > 0.0
            {
                output_duration = Some(source.duration);
            }

            inputs.push(background_input);
            inputs.push(source_input);

            filters.push(foreground_chain(settings, 1, foreground));
            filters.push(format!(
                "{}{}[{}]",
                filters::video_stream(0),
                filters::scale(size),
                BACKGROUND_LABEL
            ));
            filters.push(format!("{}[{}]", filters::black_canvas(canvas), CANVAS_LABEL));
            filters.push(filters::overlay(
                CANVAS_LABEL,
                BACKGROUND_LABEL,
                settings.transforms.background.offset(),
                true,
                PLACED_LABEL,
            ));
            filters.push(filters::overlay(
                PLACED_LABEL,
                FOREGROUND_LABEL,
                settings.transforms.foreground.offset(),
                output_duration.is_none(),
                OUTPUT_LABEL,
            ));
            1
        }
    };

    let format = match mode {
        RenderMode::Preview => OutputFormat::Mp4,
        RenderMode::Export => settings.effective_format(),
    };

    let mut video_map = format!("[{}]", OUTPUT_LABEL);
    if format == OutputFormat::Gif {
        filters.push(format!(
            "[{}]{}[{}]",
            OUTPUT_LABEL,
            filters::GIF_PALETTE_CHAIN,
            GIF_LABEL
        ));
        video_map = format!("[{}]", GIF_LABEL);
    }

    let audio_map = format
        .has_audio()
        .then(|| filters::optional_audio_stream(audio_index));

    let expected_duration = trim
        .unwrap_or(source.duration)
        .max(MIN_EXPECTED_DURATION);

    Ok(CompositionPlan {
        mode,
        inputs,
        filters,
        video_map,
        audio_map,
        encoder: Encoder::select(mode, format, transparent),
        format,
        extension: format.extension(),
        output_duration,
        expected_duration,
        canvas,
        foreground,
        background: background_size,
    })
}

/// Canvas size: preset, else background (when asked for), else source,
/// else the fallback.
pub fn canvas_size(
    resolution: Resolution,
    source: &MediaProperties,
    background: Option<&MediaProperties>,
) -> FrameSize {
    if let Some((width, height)) = resolution.preset_dimensions() {
        return FrameSize::new(width, height);
    }

    let natural = match (resolution, background) {
        (Resolution::OriginalBackground, Some(bg)) if bg.has_dimensions() => Some(bg),
        _ if source.has_dimensions() => Some(source),
        _ => None,
    };

    natural
        .map(|p| FrameSize::even(p.width, p.height))
        .unwrap_or(FALLBACK_CANVAS)
}

/// Scaled, even layer size.
pub fn layer_size(properties: &MediaProperties, transform: &LayerTransform) -> FrameSize {
    FrameSize::scaled(properties.width, properties.height, transform.scale)
}

/// `[i:v]scale=W:H[,chromakey=...][fg_processed]`
fn foreground_chain(settings: &CompositionSettings, index: usize, size: FrameSize) -> String {
    let mut chain = format!("{}{}", filters::video_stream(index), filters::scale(size));
    if settings.is_keying_enabled {
        chain.push(',');
        chain.push_str(&filters::chromakey(
            &settings.engine_key_color(),
            settings.similarity,
            settings.blend,
        ));
    }
    chain.push_str(&format!("[{}]", FOREGROUND_LABEL));
    chain
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn source() -> MediaProperties {
        MediaProperties::new(1280, 720, 10.0)
    }

    fn video_background() -> MediaProperties {
        MediaProperties::new(1920, 1080, 30.0)
    }

    fn still_background() -> MediaProperties {
        MediaProperties::still(1919, 1081)
    }

    fn opaque() -> CompositionSettings {
        CompositionSettings::default()
    }

    fn transparent() -> CompositionSettings {
        CompositionSettings {
            transparent: true,
            is_keying_enabled: false,
            ..Default::default()
        }
    }

    fn export(settings: &CompositionSettings, bg: Option<&MediaProperties>) -> CompositionPlan {
        build_plan(settings, &source(), bg, RenderMode::Export).unwrap()
    }

    #[test]
    fn test_transparent_source_only() {
        let plan = export(&transparent(), None);

        assert_eq!(plan.canvas, FrameSize::new(1280, 720));
        assert_eq!(plan.overlays().len(), 1);
        assert_eq!(plan.extension, "mov");
        assert_eq!(plan.output_file_name(), "output.mov");
        assert!(!plan.has_chroma_key());
        assert!(!plan.has_background());
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.audio_map.as_deref(), Some("0:a?"));
        assert_eq!(
            plan.filters,
            vec![
                "[0:v]scale=1280:720[fg_processed]".to_string(),
                "color=c=black@0.0:s=1280x720:r=25,format=yuva444p[base]".to_string(),
                "[base][fg_processed]overlay=x=0:y=0:shortest=1[outv]".to_string(),
            ]
        );
        assert!(plan.output_args().windows(2).any(|w| w == ["-profile:v", "4"]));
        assert!(plan.output_args().windows(2).any(|w| w == ["-pix_fmt", "yuva444p"]));
    }

    #[test]
    fn test_transparent_ignores_background_and_loop() {
        let settings = CompositionSettings {
            loop_mode: LoopMode::Background,
            format: OutputFormat::Gif,
            ..transparent()
        };
        let plan = export(&settings, Some(&video_background()));
        assert!(!plan.has_background());
        assert!(plan.background.is_none());
        assert_eq!(plan.format, OutputFormat::Prores);
        assert!(!plan.input(InputRole::Source).unwrap().has_option("-stream_loop"));
    }

    #[test]
    fn test_trim_window() {
        let settings = CompositionSettings {
            start_time: Some(2.0),
            end_time: Some(5.0),
            ..opaque()
        };
        let plan = export(&settings, Some(&video_background()));

        assert_eq!(plan.output_duration, Some(3.0));
        assert_eq!(plan.expected_duration, 3.0);
        assert_eq!(&plan.output_args()[..2], &["-t", "3.000"]);

        let source = plan.input(InputRole::Source).unwrap();
        assert_eq!(source.options(), vec!["-ss", "2.000"]);
        let background = plan.input(InputRole::Background).unwrap();
        assert_eq!(background.options(), vec!["-ss", "2.000"]);

        // The explicit duration bounds the output instead of the shortest input.
        let overlays = plan.overlays();
        assert!(!overlays[1].contains("shortest"));
    }

    #[test]
    fn test_end_without_start_trims_from_zero() {
        let settings = CompositionSettings {
            end_time: Some(4.0),
            ..opaque()
        };
        let plan = export(&settings, Some(&video_background()));
        assert_eq!(plan.output_duration, Some(4.0));
        assert!(!plan.input(InputRole::Source).unwrap().has_option("-ss"));
    }

    #[test]
    fn test_preset_resolution() {
        let settings = CompositionSettings {
            resolution: Resolution::Uhd4k,
            ..opaque()
        };
        let plan = export(&settings, Some(&video_background()));
        assert_eq!(plan.canvas, FrameSize::new(3840, 2160));
        assert!(plan.filters.contains(&"color=c=black:s=3840x2160[canvas]".to_string()));
    }

    #[test]
    fn test_canvas_selection() {
        let bg = still_background();
        assert_eq!(
            canvas_size(Resolution::OriginalBackground, &source(), Some(&bg)),
            FrameSize::new(1920, 1082)
        );
        assert_eq!(
            canvas_size(Resolution::OriginalBackground, &source(), None),
            FrameSize::new(1280, 720)
        );
        assert_eq!(
            canvas_size(Resolution::OriginalSource, &MediaProperties::new(641, 361, 1.0), None),
            FrameSize::new(642, 362)
        );
        assert_eq!(
            canvas_size(Resolution::OriginalSource, &MediaProperties::new(0, 0, 1.0), None),
            FALLBACK_CANVAS
        );
        assert_eq!(
            canvas_size(Resolution::Hd720, &source(), Some(&bg)),
            FrameSize::new(1280, 720)
        );
    }

    #[test]
    fn test_layer_sizes_are_even() {
        let naturals = [(1, 1), (3, 5), (641, 361), (1280, 720), (1919, 1081)];
        let scales = [0.01, 0.33, 0.5, 0.777, 1.0, 1.5, 2.25, 10.0];
        for (w, h) in naturals {
            for scale in scales {
                let size = FrameSize::scaled(w, h, scale);
                assert!(size.is_even(), "{}x{} at {} gave {:?}", w, h, scale, size);
                assert!(size.width >= 2 && size.height >= 2);
            }
        }
        assert_eq!(FrameSize::scaled(1280, 720, 0.5), FrameSize::new(640, 360));
        assert_eq!(FrameSize::scaled(641, 361, 1.0), FrameSize::new(642, 362));
    }

    #[test]
    fn test_chroma_key_chain() {
        let settings = CompositionSettings {
            key_color: "#0000FF".to_string(),
            similarity: 0.3,
            blend: 0.05,
            ..opaque()
        };
        let plan = export(&settings, Some(&video_background()));
        assert_eq!(
            plan.filters[0],
            "[1:v]scale=1280:720,chromakey=color=0x0000FF:similarity=0.3:blend=0.05[fg_processed]"
        );

        let unkeyed = CompositionSettings {
            is_keying_enabled: false,
            ..opaque()
        };
        assert!(!export(&unkeyed, Some(&video_background())).has_chroma_key());
    }

    #[test]
    fn test_opaque_layout() {
        let mut settings = opaque();
        settings.transforms.background = LayerTransform {
            scale: 0.5,
            x: 10.4,
            y: -20.0,
        };
        settings.transforms.foreground.x = 100.0;
        let plan = export(&settings, Some(&video_background()));

        assert_eq!(plan.inputs[0].role, InputRole::Background);
        assert_eq!(plan.inputs[1].role, InputRole::Source);
        assert_eq!(plan.background, Some(FrameSize::new(960, 540)));
        assert_eq!(plan.audio_map.as_deref(), Some("1:a?"));
        assert_eq!(plan.video_map, "[outv]");
        assert_eq!(
            plan.overlays(),
            vec![
                "[canvas][bg_scaled]overlay=x=10:y=-20:shortest=1[bg_placed]",
                "[bg_placed][fg_processed]overlay=x=100:y=0:shortest=1[outv]",
            ]
        );
        assert_eq!(plan.expected_duration, 10.0);
    }

    #[test]
    fn test_missing_background_is_rejected() {
        let result = build_plan(&opaque(), &source(), None, RenderMode::Export);
        assert!(matches!(result, Err(MediaError::InvalidPlan(_))));
    }

    #[test]
    fn test_still_background_loops() {
        let settings = CompositionSettings {
            start_time: Some(1.0),
            ..opaque()
        };
        let plan = export(&settings, Some(&still_background()));
        let background = plan.input(InputRole::Background).unwrap();
        assert_eq!(background.options(), vec!["-loop", "1"]);
    }

    #[test]
    fn test_loop_modes() {
        let looped_bg = CompositionSettings {
            loop_mode: LoopMode::Background,
            ..opaque()
        };
        let plan = export(&looped_bg, Some(&video_background()));
        assert!(plan.input(InputRole::Background).unwrap().has_option("-stream_loop"));
        assert!(!plan.input(InputRole::Source).unwrap().has_option("-stream_loop"));

        let looped_source = CompositionSettings {
            loop_mode: LoopMode::Source,
            ..opaque()
        };
        let plan = export(&looped_source, Some(&video_background()));
        assert!(plan.input(InputRole::Source).unwrap().has_option("-stream_loop"));
        assert!(plan.output_duration.is_none());

        // Both inputs endless: the source length bounds the output.
        let plan = export(&looped_source, Some(&still_background()));
        assert_eq!(plan.output_duration, Some(10.0));
        assert!(!plan.overlays()[1].contains("shortest"));
    }

    #[test]
    fn test_gif_has_no_audio() {
        let settings = CompositionSettings {
            format: OutputFormat::Gif,
            ..opaque()
        };
        let plan = export(&settings, Some(&video_background()));
        assert!(plan.audio_map.is_none());
        assert_eq!(plan.video_map, "[outgif]");
        assert_eq!(plan.extension, "gif");
        assert!(plan
            .filter_graph()
            .ends_with("[outv]fps=15,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse[outgif]"));
        assert!(!plan.output_args().contains(&"-vf".to_string()));
    }

    #[test]
    fn test_export_encoders() {
        let webm = CompositionSettings {
            format: OutputFormat::Webm,
            ..opaque()
        };
        let plan = export(&webm, Some(&video_background()));
        assert_eq!(plan.extension, "webm");
        assert!(plan.output_args().contains(&"libvpx-vp9".to_string()));

        let prores = CompositionSettings {
            format: OutputFormat::Prores,
            ..opaque()
        };
        let plan = export(&prores, Some(&video_background()));
        assert!(plan.output_args().windows(2).any(|w| w == ["-profile:v", "3"]));
        assert!(!plan.output_args().contains(&"yuva444p".to_string()));

        let mp4 = export(&opaque(), Some(&video_background()));
        assert!(mp4.output_args().windows(2).any(|w| w == ["-crf", "23"]));
        assert!(mp4.output_args().windows(2).any(|w| w == ["-b:a", "192k"]));
    }

    #[test]
    fn test_preview_uses_fast_profile() {
        for settings in [
            CompositionSettings {
                format: OutputFormat::Gif,
                ..opaque()
            },
            transparent(),
        ] {
            let plan = build_plan(&settings, &source(), Some(&video_background()), RenderMode::Preview)
                .unwrap();
            assert_eq!(plan.format, OutputFormat::Mp4);
            assert_eq!(plan.output_file_name(), "preview.mp4");
            assert!(plan.output_args().windows(2).any(|w| w == ["-preset", "ultrafast"]));
            assert!(plan.output_args().windows(2).any(|w| w == ["-crf", "35"]));
            assert!(plan.audio_map.is_some());
        }
    }

    #[test]
    fn test_transparent_canvas_can_follow_background() {
        let settings = CompositionSettings {
            resolution: Resolution::OriginalBackground,
            ..transparent()
        };
        let plan = export(&settings, Some(&video_background()));
        assert_eq!(plan.canvas, FrameSize::new(1920, 1080));
        assert!(!plan.has_background());
    }

    #[test]
    fn test_expected_duration_floor() {
        let short = MediaProperties::new(640, 360, 0.4);
        let plan = build_plan(&transparent(), &short, None, RenderMode::Export).unwrap();
        assert_eq!(plan.expected_duration, 1.0);
    }

    #[test]
    fn test_to_command() {
        let settings = CompositionSettings {
            start_time: Some(2.0),
            end_time: Some(5.0),
            ..opaque()
        };
        let plan = export(&settings, Some(&still_background()));
        let command = plan
            .to_command(
                Path::new("jobs/a/source_video.mp4"),
                Some(Path::new("jobs/a/background.png")),
                Path::new("jobs/a/output.mp4"),
            )
            .unwrap();

        assert_eq!(command.inputs()[0].path, PathBuf::from("jobs/a/background.png"));
        assert_eq!(command.inputs()[1].path, PathBuf::from("jobs/a/source_video.mp4"));
        assert_eq!(command.maps(), &["[outv]".to_string(), "1:a?".to_string()]);
        assert_eq!(command.output_path(), Path::new("jobs/a/output.mp4"));

        let args = command.build_args();
        assert!(args.contains(&plan.filter_graph()));

        let missing = plan.to_command(Path::new("s.mp4"), None, Path::new("o.mp4"));
        assert!(missing.is_err());
    }
}
