//! Configuration module for Ripple-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every tunable is assembled once into an immutable [`Config`] that is handed
//! to the harvester explicitly.
//!
//! # Example
//!
//! ```no_run
//! use ripple_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting with {} workers", config.harvester.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HarvesterConfig, HttpConfig, InputConfig, InputKind, OutputConfig, RetryConfig,
};

// Re-export parser functions
pub use parser::{apply_env_overrides, compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, MAX_CONCURRENCY};
