//! Result cache configuration
//!
//! Per-operation time-to-live for memoized analytics results.

use serde::Deserialize;

/// Cache TTLs in seconds
///
/// # Example
///
/// ```toml
/// [cache]
/// breakdown_ttl_secs = 300
/// top_ttl_secs = 600
/// performance_ttl_secs = 120
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Breakdown results
    /// Default: 300
    pub breakdown_ttl_secs: u64,

    /// Top-N rankings
    /// Default: 600
    pub top_ttl_secs: u64,

    /// Performance comparisons
    /// Default: 120
    pub performance_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            breakdown_ttl_secs: 300,
            top_ttl_secs: 600,
            performance_ttl_secs: 120,
        }
    }
}
