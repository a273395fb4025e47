//! Error types for asset retrieval.

use thiserror::Error;

/// Why an asset could not be fetched.
///
/// Never fails a job on its own: the render service falls back to a screenshot.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Server answered with a non-success status.
    #[error("Failed to download {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Request timed out.
    #[error("Timed out downloading {url}")]
    Timeout { url: String },

    /// Connection or protocol failure.
    #[error("Failed to download {url}: {reason}")]
    Transport { url: String, reason: String },

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl DownloadError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
