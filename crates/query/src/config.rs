//! Query configuration types

use serde::{Deserialize, Serialize};

/// SQL backend connection settings
///
/// Only ClickHouse speaks SQL for now; the in-memory store lives in
/// `inkstat-analytics` and needs no connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Backend type
    pub backend: QueryBackendType,

    /// ClickHouse HTTP URL
    pub url: Option<String>,

    /// Database name
    pub database: Option<String>,

    /// Username for authentication
    pub username: Option<String>,

    /// Password for authentication
    pub password: Option<String>,

    /// Server-side execution limit in seconds
    pub max_execution_time: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            backend: QueryBackendType::ClickHouse,
            url: None,
            database: None,
            username: None,
            password: None,
            max_execution_time: 60,
        }
    }
}

impl QueryConfig {
    /// Create config for ClickHouse backend
    pub fn clickhouse(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            backend: QueryBackendType::ClickHouse,
            url: Some(url.into()),
            database: Some(database.into()),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Query backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryBackendType {
    /// ClickHouse over HTTP
    ClickHouse,
}
