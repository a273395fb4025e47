//! Trait definitions for the retriever module.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::DownloadError;

/// Fetches the bytes behind a composed asset URL.
#[async_trait]
pub trait ArtifactRetriever: Send + Sync {
    /// Returns the name of this retriever implementation.
    fn name(&self) -> &str;

    /// Fetches the whole body. Any non-success response is an error.
    async fn fetch(&self, url: &str) -> Result<Bytes, DownloadError>;
}
