use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::driver::{BrowserSettings, WizardConfig};
use crate::render::{RenderSettings, StorageConfig};
use crate::retriever::RetrieverConfig;
use crate::transcoder::{TranscodeSpec, TranscoderConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub wizard: WizardConfig,
    #[serde(default)]
    pub retriever: RetrieverConfig,
    /// ffmpeg process settings.
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    /// Filter settings applied to every job.
    #[serde(default)]
    pub transcode: TranscodeSpec,
}

impl Config {
    /// The slice of configuration the render service runs on.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            storage: self.storage.clone(),
            wizard: self.wizard.clone(),
            retriever: self.retriever.clone(),
            transcode: self.transcode.clone(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload, in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload() -> usize {
    20 * 1024 * 1024
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("sketchloop.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::OutputFormat;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path, PathBuf::from("sketchloop.db"));
        assert_eq!(config.storage.root, PathBuf::from("storage"));
        assert_eq!(config.wizard.max_attempts, 20);
        assert_eq!(config.transcode.output_format, OutputFormat::Webp);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_sections_override() {
        let toml = r#"
[server]
port = 8088

[wizard]
max_attempts = 5

[transcode]
output_format = "gif"
remove_background = false
crop_top = 0

[retriever]
render_wait_ms = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.wizard.max_attempts, 5);
        assert_eq!(config.transcode.output_format, OutputFormat::Gif);
        assert!(!config.transcode.remove_background);
        assert_eq!(config.transcode.crop_top, 0);
        assert_eq!(config.transcode.crop_left, 50);
        assert_eq!(config.retriever.render_wait_ms, 0);
    }

    #[test]
    fn test_render_settings_slice() {
        let mut config = Config::default();
        config.wizard.max_attempts = 7;
        config.storage.root = PathBuf::from("/data");

        let settings = config.render_settings();
        assert_eq!(settings.wizard.max_attempts, 7);
        assert_eq!(settings.storage.root, PathBuf::from("/data"));
    }
}
