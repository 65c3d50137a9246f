//! FFmpeg filter graph fragments used by composition plans.

use crate::plan::FrameSize;

/// GIF palette chain: 15 fps, palette generated from the clip itself.
pub const GIF_PALETTE_CHAIN: &str = "fps=15,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse";

/// Frame rate of the generated transparent canvas.
pub const CANVAS_FRAME_RATE: u32 = 25;

/// `scale=W:H`
pub fn scale(size: FrameSize) -> String {
    format!("scale={}:{}", size.width, size.height)
}

/// `chromakey=color=C:similarity=S:blend=B`
pub fn chromakey(color: &str, similarity: f64, blend: f64) -> String {
    format!("chromakey=color={}:similarity={}:blend={}", color, similarity, blend)
}

/// Fully transparent canvas source.
pub fn transparent_canvas(size: FrameSize) -> String {
    format!(
        "color=c=black@0.0:s={}x{}:r={},format=yuva444p",
        size.width, size.height, CANVAS_FRAME_RATE
    )
}

/// Opaque black canvas source.
pub fn black_canvas(size: FrameSize) -> String {
    format!("color=c=black:s={}x{}", size.width, size.height)
}

/// `[base][top]overlay=x=X:y=Y[:shortest=1][out]`
pub fn overlay(base: &str, top: &str, offset: (i64, i64), shortest: bool, out: &str) -> String {
    let mut filter = format!("[{}][{}]overlay=x={}:y={}", base, top, offset.0, offset.1);
    if shortest {
        filter.push_str(":shortest=1");
    }
    filter.push_str(&format!("[{}]", out));
    filter
}

/// Video stream specifier of input `index`.
pub fn video_stream(index: usize) -> String {
    format!("[{}:v]", index)
}

/// Optional audio stream specifier of input `index`.
pub fn optional_audio_stream(index: usize) -> String {
    format!("{}:a?", index)
}
