//! FFmpeg command builder.

use std::fmt;
use std::path::{Path, PathBuf};

/// One `-i` input with the options that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    /// Input arguments (before -i)
    pub options: Vec<String>,
    /// Input file path
    pub path: PathBuf,
}

impl Input {
    /// Create an input without options.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            options: Vec::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Add an input argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.options.push(arg.into());
        self
    }

    /// Seek before decoding.
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format_seconds(seconds))
    }

    /// Repeat the input stream forever.
    pub fn stream_loop(self) -> Self {
        self.arg("-stream_loop").arg("-1")
    }

    /// Turn a still image into an endless video stream.
    pub fn loop_still(self) -> Self {
        self.arg("-loop").arg("1")
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in index order
    inputs: Vec<Input>,
    /// Output file path
    output: PathBuf,
    /// Filter graph
    filter_complex: Option<String>,
    /// Stream maps (labels or specifiers)
    maps: Vec<String>,
    /// Output arguments (after the maps)
    output_args: Vec<String>,
    /// Whether to emit `-progress pipe:2`
    progress: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            filter_complex: None,
            maps: Vec::new(),
            output_args: Vec::new(),
            progress: true,
        }
    }

    /// Add an input.
    pub fn input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    /// Set filter complex.
    pub fn filter_complex(mut self, filter: impl Into<String>) -> Self {
        self.filter_complex = Some(filter.into());
        self
    }

    /// Map a filter label or stream specifier to the output.
    pub fn map(mut self, stream: impl Into<String>) -> Self {
        self.maps.push(stream.into());
        self
    }

    /// Add output arguments.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Limit the output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format_seconds(seconds))
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-vframes").output_arg("1")
    }

    /// Do not ask FFmpeg for machine-readable progress.
    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn maps(&self) -> &[String] {
        &self.maps
    }

    pub fn filter_graph(&self) -> Option<&str> {
        self.filter_complex.as_deref()
    }

    pub fn output_options(&self) -> &[String] {
        &self.output_args
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];

        if self.progress {
            args.push("-nostats".to_string());
            args.push("-progress".to_string());
            args.push("pipe:2".to_string());
        }

        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        if let Some(filter) = &self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(filter.clone());
        }

        for stream in &self.maps {
            args.push("-map".to_string());
            args.push(stream.clone());
        }

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ffmpeg {}", self.build_args().join(" "))
    }
}

/// Seconds as FFmpeg accepts them, millisecond precision.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input(Input::new("bg.png").loop_still())
            .input(Input::new("fg.mp4").seek(10.0))
            .filter_complex("[1:v]scale=2:2[fg]")
            .map("[fg]")
            .duration(30.0)
            .video_codec("libx264")
            .preset("fast")
            .crf(18)
            .audio_codec("aac")
            .audio_bitrate("128k");

        let args = cmd.build_args();
        assert_eq!(&args[..7], &["-y", "-v", "error", "-nostats", "-progress", "pipe:2", "-loop"]);

        let first_input = args.iter().position(|a| a == "bg.png").unwrap();
        let second_input = args.iter().position(|a| a == "fg.mp4").unwrap();
        let seek = args.iter().position(|a| a == "-ss").unwrap();
        let filter = args.iter().position(|a| a == "-filter_complex").unwrap();
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert!(first_input < seek && seek < second_input);
        assert!(second_input < filter && filter < map);
        assert_eq!(args[seek + 1], "10.000");
        assert!(args.contains(&"30.000".to_string()));
        assert_eq!(
            cmd.output_options(),
            &["-t", "30.000", "-c:v", "libx264", "-preset", "fast", "-crf", "18", "-c:a", "aac", "-b:a", "128k"]
        );
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_without_progress() {
        let args = FfmpegCommand::new("frame.png")
            .input(Input::new("src.mp4").seek(1.0))
            .single_frame()
            .without_progress()
            .build_args();
        assert!(!args.contains(&"-progress".to_string()));
        assert!(args.contains(&"-vframes".to_string()));
    }

    #[test]
    fn test_input_options() {
        let input = Input::new("a.mp4").stream_loop();
        assert!(input.has_option("-stream_loop"));
        assert!(!input.has_option("-loop"));
    }
}
