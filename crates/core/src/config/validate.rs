use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Wizard attempt budget is positive
/// - Asset base URL is http(s)
/// - Transcode spec (width, fps, colour-key tolerances)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.wizard.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "wizard.max_attempts must be at least 1".to_string(),
        ));
    }

    let base_url = &config.retriever.asset_base_url;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "retriever.asset_base_url must be an http(s) URL, got {}",
            base_url
        )));
    }

    crate::transcoder::validate_spec(&config.transcode)
        .map_err(|e| ConfigError::ValidationError(format!("transcode: {}", e)))?;

    Ok(())
}
