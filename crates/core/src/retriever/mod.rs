//! Asset retrieval over HTTP(S).

mod config;
mod error;
mod http;
mod traits;

pub use config::RetrieverConfig;
pub use error::DownloadError;
pub use http::HttpRetriever;
pub use traits::ArtifactRetriever;
