//! Error types for the render module.

use thiserror::Error;

use crate::driver::DriverError;
use crate::job::JobStoreError;
use crate::transcoder::TranscodeError;

/// Errors returned by [`RenderService::submit`](super::RenderService::submit).
#[derive(Debug, Error)]
pub enum RenderError {
    /// Another job holds the admission slot. Nothing was recorded.
    #[error("Renderer busy")]
    Busy,

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Store(#[from] JobStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The task running the job panicked or was cancelled.
    #[error("Render task failed: {0}")]
    Task(String),
}

impl RenderError {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Busy => "busy",
            RenderError::Driver(e) => e.kind(),
            RenderError::Transcode(_) => "transcode",
            RenderError::Store(_) => "store",
            RenderError::Io(_) => "io",
            RenderError::Task(_) => "task",
        }
    }
}
