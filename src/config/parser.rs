use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Environment variables that override individual settings
pub const ENV_CONCURRENCY: &str = "HARVEST_CONCURRENCY";
pub const ENV_WAIT_MS: &str = "HARVEST_WAIT_MS";
pub const ENV_MAX_RETRIES: &str = "HARVEST_MAX_RETRIES";
pub const ENV_RETRY_DELAY_MS: &str = "HARVEST_RETRY_DELAY_MS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "HARVEST_REQUEST_TIMEOUT_SECS";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation,
/// so an override can never smuggle an invalid value past the checks.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ripple_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Concurrency: {}", config.harvester.concurrency);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    validate(&config)?;

    Ok(config)
}

/// Applies environment overrides using the given variable lookup
///
/// The lookup is injected so tests never touch the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = parse_override(&lookup, ENV_CONCURRENCY)? {
        config.harvester.concurrency = value;
    }
    if let Some(value) = parse_override(&lookup, ENV_WAIT_MS)? {
        config.harvester.inter_page_delay_ms = value;
    }
    if let Some(value) = parse_override(&lookup, ENV_MAX_RETRIES)? {
        config.retry.max_attempts = value;
    }
    if let Some(value) = parse_override(&lookup, ENV_RETRY_DELAY_MS)? {
        config.retry.base_delay_ms = value;
    }
    if let Some(value) = parse_override(&lookup, ENV_REQUEST_TIMEOUT_SECS)? {
        config.retry.request_timeout_secs = value;
    }
    Ok(())
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::Validation(format!("{} has an invalid value '{}'", key, raw))
        }),
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a checkpoint can be matched with the settings
/// that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
