//! Configuration validation
//!
//! Checks what serde alone cannot:
//! - ClickHouse needs a URL
//! - the in-memory backend only reads `data_file`
//! - cache TTLs are positive

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::query::SourceBackend;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_query(config)?;
    validate_cache(config)?;
    Ok(())
}

fn validate_query(config: &Config) -> Result<()> {
    let query = &config.query;

    match query.backend {
        SourceBackend::Clickhouse => {
            let url = query
                .url
                .as_deref()
                .ok_or_else(|| ConfigError::missing_field("query", "url"))?;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid_value(
                    "query",
                    "url",
                    format!("'{}' is not an http(s) URL", url),
                ));
            }
        }
        SourceBackend::Memory => {
            if query.url.is_some() {
                return Err(ConfigError::invalid_value(
                    "query",
                    "url",
                    "only used by the clickhouse backend",
                ));
            }
        }
    }

    if query.max_execution_time == 0 {
        return Err(ConfigError::invalid_value(
            "query",
            "max_execution_time",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn validate_cache(config: &Config) -> Result<()> {
    let cache = &config.cache;
    for (field, ttl) in [
        ("breakdown_ttl_secs", cache.breakdown_ttl_secs),
        ("top_ttl_secs", cache.top_ttl_secs),
        ("performance_ttl_secs", cache.performance_ttl_secs),
    ] {
        if ttl == 0 {
            return Err(ConfigError::invalid_value(
                "cache",
                field,
                "must be greater than zero",
            ));
        }
    }
    Ok(())
}
