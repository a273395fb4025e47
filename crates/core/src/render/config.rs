//! Storage layout for render jobs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where job files live and how outputs are addressed publicly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory; `inputs/`, `outputs/` and `tmp/` live under it.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// URL prefix under which `outputs/` is served.
    #[serde(default = "default_public_url_prefix")]
    pub public_url_prefix: String,
}

fn default_root() -> PathBuf {
    PathBuf::from("storage")
}

fn default_public_url_prefix() -> String {
    "http://localhost:3000/files/outputs".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            public_url_prefix: default_public_url_prefix(),
        }
    }
}

impl StorageConfig {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn inputs_dir(&self) -> PathBuf {
        self.root.join("inputs")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Public URL for a file in `outputs/`.
    pub fn public_url(&self, output_path: &Path) -> String {
        let file_name = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.public_url_prefix.trim_end_matches('/'), file_name)
    }

    /// Creates the storage directories.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.inputs_dir(), self.outputs_dir(), self.tmp_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}
