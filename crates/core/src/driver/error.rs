//! Error types for the driver module.

use thiserror::Error;

/// Faults raised while driving the wizard.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Browser could not be started.
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Page navigation failed.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// File-chooser interaction failed.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Animation id or asset name could not be obtained.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Fallback screenshot could not be captured.
    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    /// Any other browser protocol fault.
    #[error("Browser error: {0}")]
    Protocol(String),
}

impl DriverError {
    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::Extraction(reason.into())
    }

    pub fn upload(reason: impl Into<String>) -> Self {
        Self::Upload(reason.into())
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch(_) => "launch",
            Self::Navigation(_) => "navigation",
            Self::Upload(_) => "upload",
            Self::Extraction(_) => "extraction",
            Self::Screenshot(_) => "screenshot",
            Self::Protocol(_) => "protocol",
        }
    }
}
