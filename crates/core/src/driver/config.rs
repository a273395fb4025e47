//! Driver configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Chromium launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run without a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary (auto-detected when unset).
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Disable the Chrome sandbox (needed in most containers).
    #[serde(default)]
    pub no_sandbox: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Timeout for the browser process to come up (seconds).
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    900
}

fn default_launch_timeout() -> u64 {
    20
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
            no_sandbox: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            launch_timeout_secs: default_launch_timeout(),
        }
    }
}

/// Wizard navigation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Page where the wizard starts.
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// Page text that marks the animation selection step.
    #[serde(default = "default_terminal_marker")]
    pub terminal_marker: String,

    /// URL fragment of the response carrying the animation id.
    #[serde(default = "default_endpoint_fragment")]
    pub animation_endpoint_fragment: String,

    /// Maximum probes of the wizard loop.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before each wizard probe (milliseconds).
    #[serde(default = "default_step_settle")]
    pub step_settle_ms: u64,

    /// Delay before enumerating the results grid (milliseconds).
    #[serde(default = "default_results_settle")]
    pub results_settle_ms: u64,

    /// Delay after clicking a result (milliseconds).
    #[serde(default = "default_selection_settle")]
    pub selection_settle_ms: u64,

    /// How long to look for a consent overlay (milliseconds).
    #[serde(default = "default_consent_timeout")]
    pub consent_timeout_ms: u64,

    /// How long to wait for the upload affordance and file chooser (milliseconds).
    #[serde(default = "default_selector_timeout")]
    pub selector_timeout_ms: u64,

    /// Bound on waiting for the animation id after the loop (seconds, 0 = wait forever).
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,
}

fn default_start_url() -> String {
    "https://sketch.metademolab.com/canvas".to_string()
}

fn default_terminal_marker() -> String {
    "Add animation".to_string()
}

fn default_endpoint_fragment() -> String {
    "get_animation".to_string()
}

fn default_max_attempts() -> u32 {
    20
}

fn default_step_settle() -> u64 {
    2000
}

fn default_results_settle() -> u64 {
    1500
}

fn default_selection_settle() -> u64 {
    1000
}

fn default_consent_timeout() -> u64 {
    1000
}

fn default_selector_timeout() -> u64 {
    30_000
}

fn default_extraction_timeout() -> u64 {
    180
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            terminal_marker: default_terminal_marker(),
            animation_endpoint_fragment: default_endpoint_fragment(),
            max_attempts: default_max_attempts(),
            step_settle_ms: default_step_settle(),
            results_settle_ms: default_results_settle(),
            selection_settle_ms: default_selection_settle(),
            consent_timeout_ms: default_consent_timeout(),
            selector_timeout_ms: default_selector_timeout(),
            extraction_timeout_secs: default_extraction_timeout(),
        }
    }
}

impl WizardConfig {
    /// Zero delays, for driving mock sessions in tests.
    pub fn immediate() -> Self {
        Self {
            step_settle_ms: 0,
            results_settle_ms: 0,
            selection_settle_ms: 0,
            consent_timeout_ms: 0,
            ..Default::default()
        }
    }

    pub fn step_settle(&self) -> Duration {
        Duration::from_millis(self.step_settle_ms)
    }

    pub fn results_settle(&self) -> Duration {
        Duration::from_millis(self.results_settle_ms)
    }

    pub fn selection_settle(&self) -> Duration {
        Duration::from_millis(self.selection_settle_ms)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_millis(self.consent_timeout_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    /// `None` means unbounded.
    pub fn extraction_timeout(&self) -> Option<Duration> {
        match self.extraction_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wizard_config() {
        let config = WizardConfig::default();
        assert_eq!(config.max_attempts, 20);
        assert_eq!(config.step_settle(), Duration::from_secs(2));
        assert_eq!(config.results_settle(), Duration::from_millis(1500));
        assert_eq!(config.terminal_marker, "Add animation");
        assert_eq!(config.animation_endpoint_fragment, "get_animation");
        assert_eq!(config.extraction_timeout(), Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_zero_extraction_timeout_is_unbounded() {
        let config: WizardConfig = toml::from_str("extraction_timeout_secs = 0").unwrap();
        assert_eq!(config.extraction_timeout(), None);
    }

    #[test]
    fn test_default_browser_settings() {
        let settings = BrowserSettings::default();
        assert!(settings.headless);
        assert!(settings.executable.is_none());
        assert!(!settings.no_sandbox);
    }

    #[test]
    fn test_deserialize_browser_settings() {
        let toml = r#"
            headless = false
            executable = "/usr/bin/chromium"
            no_sandbox = true
        "#;
        let settings: BrowserSettings = toml::from_str(toml).unwrap();
        assert!(!settings.headless);
        assert_eq!(settings.executable, Some(PathBuf::from("/usr/bin/chromium")));
        assert!(settings.no_sandbox);
        assert_eq!(settings.window_width, 1280);
    }
}
