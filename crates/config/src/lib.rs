//! inkstat Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config: in-memory store, info logging and the
//! default cache TTLs.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use inkstat_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[log]\nlevel = \"debug\"").unwrap();
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "json"
//!
//! [query]
//! backend = "clickhouse"
//! url = "http://localhost:8123"
//! database = "blog"
//!
//! [cache]
//! top_ttl_secs = 900
//! ```

mod cache;
mod error;
mod logging;
mod query;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use cache::CacheConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use query::{QueryConfig, SourceBackend};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Where view events are read from
    pub query: QueryConfig,

    /// Result cache TTLs
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
