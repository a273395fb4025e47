//! Mock retriever for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::retriever::{ArtifactRetriever, DownloadError};

/// Mock implementation of the ArtifactRetriever trait.
///
/// Serves a fixed body for every URL unless an error is queued, and records
/// the URLs it was asked for.
#[derive(Debug, Clone)]
pub struct MockRetriever {
    body: Arc<RwLock<Bytes>>,
    requests: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<DownloadError>>>,
    fail_always: Arc<RwLock<Option<u16>>>,
    delay_ms: Arc<RwLock<u64>>,
    panic_on_fetch: Arc<RwLock<bool>>,
}

impl Default for MockRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRetriever {
    pub fn new() -> Self {
        Self {
            body: Arc::new(RwLock::new(Bytes::from_static(b"mock-mp4"))),
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            fail_always: Arc::new(RwLock::new(None)),
            delay_ms: Arc::new(RwLock::new(0)),
            panic_on_fetch: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn set_body(&self, body: impl Into<Bytes>) {
        *self.body.write().await = body.into();
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: DownloadError) {
        *self.next_error.write().await = Some(error);
    }

    /// Answer every fetch with this HTTP status (`None` to stop).
    pub async fn set_fail_status(&self, status: Option<u16>) {
        *self.fail_always.write().await = status;
    }

    /// Simulated download time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Panic inside `fetch`, like a bug in a real retriever would.
    pub async fn set_panic_on_fetch(&self, panic: bool) {
        *self.panic_on_fetch.write().await = panic;
    }

    /// URLs fetched so far.
    pub async fn requested_urls(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl ArtifactRetriever for MockRetriever {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, DownloadError> {
        self.requests.write().await.push(url.to_string());

        let delay_ms = *self.delay_ms.read().await;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if *self.panic_on_fetch.read().await {
            panic!("mock retriever panicked fetching {}", url);
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if let Some(status) = *self.fail_always.read().await {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(self.body.read().await.clone())
    }
}
