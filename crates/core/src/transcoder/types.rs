//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output container for the rendered loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Animated GIF (palette based, 1-bit transparency)
    Gif,
    /// Animated WebP (full alpha channel)
    Webp,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Filter and encoder settings for one transcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeSpec {
    /// Pixels removed from the top edge.
    #[serde(default = "default_crop_vertical")]
    pub crop_top: u32,
    /// Pixels removed from the bottom edge.
    #[serde(default = "default_crop_vertical")]
    pub crop_bottom: u32,
    /// Pixels removed from the left edge.
    #[serde(default = "default_crop_horizontal")]
    pub crop_left: u32,
    /// Pixels removed from the right edge.
    #[serde(default = "default_crop_horizontal")]
    pub crop_right: u32,
    /// Output width; height follows the aspect ratio.
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
    /// Key out the near-white drawing background.
    #[serde(default = "default_remove_background")]
    pub remove_background: bool,
    /// Colour-key similarity (0.01-1.0).
    #[serde(default = "default_similarity")]
    pub background_similarity: f32,
    /// Colour-key edge blend (0.0-1.0).
    #[serde(default = "default_blend")]
    pub background_blend: f32,
}

fn default_crop_vertical() -> u32 {
    100
}

fn default_crop_horizontal() -> u32 {
    50
}

fn default_target_width() -> u32 {
    480
}

fn default_fps() -> u32 {
    15
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Webp
}

fn default_remove_background() -> bool {
    true
}

fn default_similarity() -> f32 {
    0.12
}

fn default_blend() -> f32 {
    0.08
}

impl Default for TranscodeSpec {
    fn default() -> Self {
        Self {
            crop_top: default_crop_vertical(),
            crop_bottom: default_crop_vertical(),
            crop_left: default_crop_horizontal(),
            crop_right: default_crop_horizontal(),
            target_width: default_target_width(),
            fps: default_fps(),
            output_format: default_output_format(),
            remove_background: default_remove_background(),
            background_similarity: default_similarity(),
            background_blend: default_blend(),
        }
    }
}

impl TranscodeSpec {
    /// Whether any edge is cropped.
    pub fn has_crop(&self) -> bool {
        self.crop_top > 0 || self.crop_bottom > 0 || self.crop_left > 0 || self.crop_right > 0
    }

    /// Removes all crop margins.
    pub fn without_crop(mut self) -> Self {
        self.crop_top = 0;
        self.crop_bottom = 0;
        self.crop_left = 0;
        self.crop_right = 0;
        self
    }

    /// Sets the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Enables or disables background removal.
    pub fn with_background_removal(mut self, remove: bool) -> Self {
        self.remove_background = remove;
        self
    }
}

/// A single transcode request.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Job ID this transcode belongs to.
    pub job_id: String,
    /// Downloaded source video.
    pub input_path: PathBuf,
    /// Destination file (extension should match the spec's format).
    pub output_path: PathBuf,
    pub spec: TranscodeSpec,
}

/// Result of a successful transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeResult {
    pub job_id: String,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    /// Wall-clock time spent in ffmpeg.
    pub duration_ms: u64,
}

/// Progress reported by ffmpeg while encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeProgress {
    pub job_id: String,
    /// Output timestamp reached so far.
    pub time_secs: f64,
    /// Encoding speed relative to realtime (e.g. "2.5x").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
}
