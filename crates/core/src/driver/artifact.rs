//! Artifact identifiers and asset URL composition.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::error::DriverError;

/// Matches `/<token>.<variant>.gif` at the end of a thumbnail URL.
static ASSET_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([a-zA-Z0-9_-]+)\.\w+\.gif$").expect("valid asset name pattern"));

/// The two tokens needed to address a rendered animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Opaque id returned by the animation endpoint.
    pub animation_id: String,
    /// Filename token parsed from the selected thumbnail.
    pub asset_name: String,
}

/// Final asset locations for one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUrls {
    pub video: String,
    pub still: String,
}

impl ArtifactReference {
    pub fn new(animation_id: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Self {
            animation_id: animation_id.into(),
            asset_name: asset_name.into(),
        }
    }

    /// `<base>/<animation_id>/<asset_name>.<ext>`
    pub fn asset_url(&self, base_url: &str, ext: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            base_url.trim_end_matches('/'),
            self.animation_id,
            self.asset_name,
            ext
        )
    }

    /// MP4 video and GIF still URLs.
    pub fn urls(&self, base_url: &str) -> AssetUrls {
        AssetUrls {
            video: self.asset_url(base_url, "mp4"),
            still: self.asset_url(base_url, "gif"),
        }
    }
}

/// Extracts the asset name from a thumbnail `src`.
pub fn parse_asset_name(src: &str) -> Result<String, DriverError> {
    ASSET_NAME_PATTERN
        .captures(src)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DriverError::extraction(format!("Could not extract asset name from src: {}", src)))
}
