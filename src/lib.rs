//! Ripple-Harvest: a resumable paginated harvester
//!
//! This crate walks a remote JSON listing API one unit of work at a time
//! (a geographic point, or an event/category pair), across many units
//! concurrently, and consolidates every harvested record into a single
//! append-only CSV dataset. Progress is checkpointed to an append-only log
//! so an interrupted run resumes where it stopped.

pub mod checkpoint;
pub mod config;
pub mod harvest;
pub mod output;
pub mod state;
pub mod unit;

use thiserror::Error;

/// Main error type for Ripple-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unit source error: {0}")]
    Unit(#[from] UnitError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] harvest::FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] harvest::ParseError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("Checkpoint error: {0}")]
    Store(#[from] checkpoint::StoreError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true if this error comes from the shared dataset or checkpoint
    ///
    /// These are the only per-unit errors that end the whole run early.
    pub fn is_shared_io(&self) -> bool {
        matches!(self, Self::Sink(_) | Self::Store(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while enumerating units of work
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Failed to read unit source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed unit source: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unit source is missing column '{0}'")]
    MissingColumn(String),
}

/// Result type alias for Ripple-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{ResumeState, UnitOutcome, WalkState};
pub use unit::{EventCategory, GeoPoint, UnitKey, WorkUnit};
