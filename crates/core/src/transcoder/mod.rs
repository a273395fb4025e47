//! Transcoder module: downloaded MP4 to an animated GIF or WebP loop.
//!
//! The filter chain is fixed: optional crop, lanczos scale to the target width,
//! frame-rate resample, then an optional colour key that removes the near-white
//! drawing background.
//!
//! # Example
//!
//! ```ignore
//! use sketchloop_core::transcoder::{FfmpegTranscoder, Transcoder, TranscodeJob, TranscodeSpec};
//!
//! let transcoder = FfmpegTranscoder::with_defaults();
//! transcoder.validate().await?;
//!
//! let result = transcoder
//!     .transcode(TranscodeJob {
//!         job_id: "job-1".to_string(),
//!         input_path: PathBuf::from("storage/tmp/job-1.mp4"),
//!         output_path: PathBuf::from("storage/outputs/job-1.webp"),
//!         spec: TranscodeSpec::default(),
//!     })
//!     .await?;
//! println!("Transcoded in {} ms", result.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscodeError;
pub use ffmpeg::{build_filter_graph, build_filters, validate_spec, FfmpegTranscoder, BACKGROUND_KEY_COLOR};
pub use traits::Transcoder;
pub use types::{OutputFormat, TranscodeJob, TranscodeProgress, TranscodeResult, TranscodeSpec};
