//! Mock transcoder for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transcoder::{TranscodeError, TranscodeJob, TranscodeResult, Transcoder};

/// Bytes written to the output path by a successful mock transcode.
pub const FAKE_LOOP: &[u8] = b"RIFF0000WEBPmock";

/// A recorded transcode job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    pub job: TranscodeJob,
    pub success: bool,
    /// Whether the input file existed when the transcode started.
    pub input_existed: bool,
}

/// Mock implementation of the Transcoder trait.
///
/// Writes a small placeholder file to the job's output path, or fails with a
/// queued error.
#[derive(Debug, Clone, Default)]
pub struct MockTranscoder {
    jobs: Arc<RwLock<Vec<RecordedTranscode>>>,
    next_error: Arc<RwLock<Option<TranscodeError>>>,
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next transcode to fail with the given error.
    pub async fn set_next_error(&self, error: TranscodeError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_jobs(&self) -> Vec<RecordedTranscode> {
        self.jobs.read().await.clone()
    }

    pub async fn transcode_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeResult, TranscodeError> {
        let input_existed = tokio::fs::try_exists(&job.input_path).await.unwrap_or(false);

        if let Some(err) = self.next_error.write().await.take() {
            self.jobs.write().await.push(RecordedTranscode {
                job,
                success: false,
                input_existed,
            });
            return Err(err);
        }

        tokio::fs::write(&job.output_path, FAKE_LOOP).await?;
        self.jobs.write().await.push(RecordedTranscode {
            job: job.clone(),
            success: true,
            input_existed,
        });

        Ok(TranscodeResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: FAKE_LOOP.len() as u64,
            duration_ms: 1,
        })
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}
