pub mod config;
pub mod driver;
pub mod job;
pub mod metrics;
pub mod render;
pub mod retriever;
pub mod testing;
pub mod transcoder;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    ServerConfig,
};
pub use driver::{
    ArtifactReference, AssetUrls, BrowserSettings, ChromiumLauncher, DriverError, SessionLauncher,
    WizardConfig, WizardSession, WizardStateMachine,
};
pub use job::{Job, JobPatch, JobStatus, JobStore, JobStoreError, SqliteJobStore};
pub use render::{
    ArtifactOutcome, JobPaths, RenderError, RenderService, RenderSettings, StorageConfig,
    SubmitRequest,
};
pub use retriever::{ArtifactRetriever, DownloadError, HttpRetriever, RetrieverConfig};
pub use transcoder::{
    FfmpegTranscoder, OutputFormat, TranscodeError, TranscodeSpec, Transcoder, TranscoderConfig,
};
