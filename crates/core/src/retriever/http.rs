//! reqwest-backed retriever.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info};

use super::config::RetrieverConfig;
use super::error::DownloadError;
use super::traits::ArtifactRetriever;

/// Plain GET retriever.
pub struct HttpRetriever {
    client: Client,
}

impl HttpRetriever {
    /// Create a new retriever with the configured timeout.
    pub fn new(config: &RetrieverConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DownloadError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactRetriever for HttpRetriever {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, DownloadError> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        info!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
