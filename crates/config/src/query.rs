//! Data source configuration
//!
//! Selects where the CLI reads view events from: a JSON fixture loaded into
//! memory, or ClickHouse over HTTP.

use std::path::PathBuf;

use serde::Deserialize;

/// Data source backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// In-memory tables, optionally seeded from `data_file`
    #[default]
    Memory,
    /// ClickHouse backend (production)
    Clickhouse,
}

impl SourceBackend {
    /// Backend name as written in config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Clickhouse => "clickhouse",
        }
    }
}

/// Query configuration
///
/// # Example
///
/// ```toml
/// # Local fixture
/// [query]
/// backend = "memory"
/// data_file = "./fixtures/blog.json"
///
/// # Or ClickHouse
/// [query]
/// backend = "clickhouse"
/// url = "http://localhost:8123"
/// database = "blog"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Backend type
    /// Default: memory
    pub backend: SourceBackend,

    /// ClickHouse HTTP URL (required when backend = clickhouse)
    pub url: Option<String>,

    /// ClickHouse database name
    /// Default: "default"
    pub database: Option<String>,

    /// ClickHouse username
    pub username: Option<String>,

    /// ClickHouse password
    pub password: Option<String>,

    /// JSON fixture seeding the in-memory store
    pub data_file: Option<PathBuf>,

    /// Server-side execution limit in seconds
    /// Default: 60
    pub max_execution_time: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::Memory,
            url: None,
            database: None,
            username: None,
            password: None,
            data_file: None,
            max_execution_time: 60,
        }
    }
}

impl QueryConfig {
    /// Get the ClickHouse database
    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or("default")
    }
}
