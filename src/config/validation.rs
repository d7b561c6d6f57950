use crate::config::types::{Config, HarvesterConfig, HttpConfig, OutputConfig, RetryConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
pub const MAX_CONCURRENCY: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_retry_config(&config.retry)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;

    if config.input.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "input path cannot be empty".to_string(),
        ));
    }

    if config.input.limit == Some(0) {
        return Err(ConfigError::Validation(
            "input limit must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates worker pool and pagination settings
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_parse_failures < 1 {
        return Err(ConfigError::Validation(format!(
            "max_parse_failures must be >= 1, got {}",
            config.max_parse_failures
        )));
    }

    Ok(())
}

/// Validates retry settings
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    // 2^31 multiplier would overflow the backoff computation long before it is useful
    if config.max_attempts > 31 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be <= 31, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the remote endpoint and header values
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("user_agent", &config.user_agent),
        ("referer", &config.referer),
        ("origin", &config.origin),
        ("accept", &config.accept),
    ] {
        if value.chars().any(|c| c.is_control()) {
            return Err(ConfigError::Validation(format!(
                "{} contains control characters",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dataset_path.is_empty() {
        return Err(ConfigError::Validation(
            "dataset_path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    if config.dataset_path == config.checkpoint_path {
        return Err(ConfigError::Validation(
            "dataset_path and checkpoint_path must differ".to_string(),
        ));
    }

    if matches!(&config.raw_dir, Some(dir) if dir.is_empty()) {
        return Err(ConfigError::Validation(
            "raw_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        toml::from_str(
            r#"
[input]
kind = "points"
path = "worldcities.csv"

[output]
dataset-path = "events.csv"
checkpoint-path = "progress.log"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = valid_config();
        config.harvester.concurrency = 0;
        assert!(validate(&config).is_err());

        config.harvester.concurrency = MAX_CONCURRENCY + 1;
        assert!(validate(&config).is_err());

        config.harvester.concurrency = MAX_CONCURRENCY;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_retry_bounds() {
        let mut config = valid_config();
        config.retry.max_attempts = 0;
        assert!(validate(&config).is_err());

        config.retry.max_attempts = 1;
        config.retry.request_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_page_limit_and_parse_failures() {
        let mut config = valid_config();
        config.harvester.max_pages = Some(0);
        assert!(validate(&config).is_err());

        config.harvester.max_pages = None;
        assert!(validate(&config).is_ok());

        config.harvester.max_parse_failures = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_base_url_scheme() {
        let mut config = valid_config();
        config.http.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        config.http.base_url = "not a url".to_string();
        assert!(validate(&config).is_err());

        config.http.base_url = "http://127.0.0.1:9000".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_header_control_characters_rejected() {
        let mut config = valid_config();
        config.http.referer = "https://example.com/\r\nX-Evil: 1".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_output_paths_must_differ() {
        let mut config = valid_config();
        config.output.checkpoint_path = config.output.dataset_path.clone();
        assert!(validate(&config).is_err());
    }
}
