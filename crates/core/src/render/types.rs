//! Types for the render module.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::driver::ScreenshotScope;
use crate::transcoder::OutputFormat;

use super::config::StorageConfig;

const DEFAULT_INPUT_EXTENSION: &str = "png";

/// One render submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Raw uploaded image.
    pub image: Bytes,
    /// Client-side file name, used only for its extension.
    pub original_name: Option<String>,
    /// Requested variant hint.
    pub demo_index: i32,
}

impl SubmitRequest {
    pub fn new(image: impl Into<Bytes>) -> Self {
        Self {
            image: image.into(),
            original_name: None,
            demo_index: 0,
        }
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn with_demo_index(mut self, demo_index: i32) -> Self {
        self.demo_index = demo_index;
        self
    }

    /// Lowercase extension from the original name, `png` if absent or odd.
    pub fn input_extension(&self) -> String {
        self.original_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_INPUT_EXTENSION.to_string())
    }
}

/// File locations of one job, all derived from its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub input: PathBuf,
    /// Transcoded loop.
    pub output: PathBuf,
    /// Screenshot written when the video cannot be fetched.
    pub degraded: PathBuf,
    /// Downloaded video before transcoding.
    pub download: PathBuf,
}

impl JobPaths {
    pub fn new(storage: &StorageConfig, id: &str, input_extension: &str, format: OutputFormat) -> Self {
        Self {
            input: storage.inputs_dir().join(format!("{}.{}", id, input_extension)),
            output: storage
                .outputs_dir()
                .join(format!("{}.{}", id, format.extension())),
            degraded: storage.outputs_dir().join(format!("{}.png", id)),
            download: storage.tmp_dir().join(format!("{}.mp4", id)),
        }
    }
}

/// What the job produced after the wizard succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOutcome {
    /// The video was fetched and transcoded.
    Transcoded { output_path: PathBuf },
    /// The video could not be fetched; a screenshot stands in for it.
    Degraded {
        screenshot_path: PathBuf,
        scope: ScreenshotScope,
        reason: String,
    },
}

impl ArtifactOutcome {
    pub fn output_path(&self) -> &Path {
        match self {
            ArtifactOutcome::Transcoded { output_path } => output_path,
            ArtifactOutcome::Degraded {
                screenshot_path, ..
            } => screenshot_path,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ArtifactOutcome::Degraded { .. })
    }

    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactOutcome::Transcoded { .. } => "transcoded",
            ArtifactOutcome::Degraded { .. } => "degraded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_extension() {
        let request = SubmitRequest::new(vec![1u8, 2, 3]);
        assert_eq!(request.input_extension(), "png");

        let request = request.with_original_name("Drawing.JPG");
        assert_eq!(request.input_extension(), "jpg");

        let request = SubmitRequest::new(vec![1u8]).with_original_name("no-extension");
        assert_eq!(request.input_extension(), "png");

        let request = SubmitRequest::new(vec![1u8]).with_original_name("weird.p/ng");
        assert_eq!(request.input_extension(), "png");
    }

    #[test]
    fn test_job_paths() {
        let storage = StorageConfig::default().with_root("/data");
        let paths = JobPaths::new(&storage, "abc", "jpg", OutputFormat::Webp);

        assert_eq!(paths.input, PathBuf::from("/data/inputs/abc.jpg"));
        assert_eq!(paths.output, PathBuf::from("/data/outputs/abc.webp"));
        assert_eq!(paths.degraded, PathBuf::from("/data/outputs/abc.png"));
        assert_eq!(paths.download, PathBuf::from("/data/tmp/abc.mp4"));

        let gif = JobPaths::new(&storage, "abc", "png", OutputFormat::Gif);
        assert_eq!(gif.output, PathBuf::from("/data/outputs/abc.gif"));
    }

    #[test]
    fn test_outcome_output_path() {
        let degraded = ArtifactOutcome::Degraded {
            screenshot_path: PathBuf::from("/data/outputs/abc.png"),
            scope: ScreenshotScope::Canvas,
            reason: "404".to_string(),
        };
        assert!(degraded.is_degraded());
        assert_eq!(degraded.output_path(), Path::new("/data/outputs/abc.png"));
        assert_eq!(degraded.label(), "degraded");
    }
}
