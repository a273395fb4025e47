//! Testing utilities and mock implementations.
//!
//! Mocks for every collaborator of the render service, so the whole pipeline
//! can run without a browser, network, or ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use sketchloop_core::testing::{MemoryJobStore, MockLauncher, MockRetriever, MockTranscoder, SessionScript};
//!
//! let launcher = MockLauncher::new(SessionScript::happy("XYZ", "foo"));
//! let retriever = MockRetriever::new();
//! retriever.set_fail_status(Some(404)).await;
//!
//! // Wire into a RenderService...
//! ```

mod memory_store;
mod mock_retriever;
mod mock_session;
mod mock_transcoder;

pub use memory_store::MemoryJobStore;
pub use mock_retriever::MockRetriever;
pub use mock_session::{IdDelivery, MockLauncher, MockSession, SessionLog, SessionScript, FAKE_PNG};
pub use mock_transcoder::{MockTranscoder, RecordedTranscode, FAKE_LOOP};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use crate::driver::WizardConfig;
    use crate::render::{RenderService, RenderSettings, StorageConfig};
    use crate::retriever::RetrieverConfig;
    use crate::transcoder::TranscodeSpec;

    use super::{MemoryJobStore, MockLauncher, MockRetriever, MockTranscoder};

    /// A tiny PNG-looking upload.
    pub fn sample_image() -> Vec<u8> {
        b"\x89PNG\r\n\x1a\nsketch".to_vec()
    }

    /// Render settings with every delay zeroed and storage under `root`.
    pub fn fast_settings(root: &std::path::Path) -> RenderSettings {
        RenderSettings {
            storage: StorageConfig::default().with_root(root),
            wizard: WizardConfig {
                extraction_timeout_secs: 2,
                ..WizardConfig::immediate()
            },
            retriever: RetrieverConfig {
                asset_base_url: "https://assets.example.com".to_string(),
                render_wait_ms: 0,
                ..Default::default()
            },
            transcode: TranscodeSpec::default(),
        }
    }

    /// The mocks behind a [`RenderService`], kept for assertions.
    pub struct MockPipeline {
        pub launcher: MockLauncher,
        pub retriever: MockRetriever,
        pub transcoder: MockTranscoder,
        pub store: Arc<MemoryJobStore>,
    }

    impl MockPipeline {
        pub fn new(launcher: MockLauncher) -> Self {
            Self {
                launcher,
                retriever: MockRetriever::new(),
                transcoder: MockTranscoder::new(),
                store: Arc::new(MemoryJobStore::new()),
            }
        }

        /// Builds a render service over clones of the mocks.
        pub fn service(&self, settings: RenderSettings) -> RenderService {
            RenderService::new(
                Arc::new(self.launcher.clone()),
                Arc::new(self.retriever.clone()),
                Arc::new(self.transcoder.clone()),
                self.store.clone(),
                settings,
            )
        }
    }
}
