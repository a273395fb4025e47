//! Retriever configuration.

use serde::{Deserialize, Serialize};

/// Configuration for fetching rendered assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Base of the asset URL template: `<base>/<animation_id>/<asset_name>.<ext>`.
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Time given to the remote renderer before the first fetch (milliseconds).
    #[serde(default = "default_render_wait")]
    pub render_wait_ms: u64,
}

fn default_asset_base_url() -> String {
    "https://production-sketch-video.metademolab.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_render_wait() -> u64 {
    5000
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            asset_base_url: default_asset_base_url(),
            timeout_secs: default_timeout(),
            render_wait_ms: default_render_wait(),
        }
    }
}
