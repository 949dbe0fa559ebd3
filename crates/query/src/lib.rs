//! inkstat Query - runs the SQL that `inkstat-analytics` builds
//!
//! The analytics crate renders one `SELECT` per scan over the joined view
//! tables. This crate sends it to a relational store and hands back rows
//! addressed by column name. ClickHouse over HTTP is the only store so far.
//!
//! ```ignore
//! use inkstat_query::{QueryBackend, QueryConfig, QueryEngine};
//!
//! let engine = QueryEngine::from_query_config(&QueryConfig::clickhouse("http://localhost:8123", "blog"))?;
//! let result = engine.execute("SELECT count FROM analytics_blogview").await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod result;

pub use backend::QueryBackend;
pub use backend::clickhouse::{ClickHouseBackend, ClickHouseBackendConfig};
pub use config::{QueryBackendType, QueryConfig};
pub use error::QueryError;
pub use result::QueryResult;

use std::sync::Arc;

/// A backend chosen from [`QueryConfig`]
#[derive(Clone)]
pub struct QueryEngine {
    backend: Arc<dyn QueryBackend>,
}

impl QueryEngine {
    pub fn new(backend: impl QueryBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Build the configured backend; ClickHouse needs a url
    pub fn from_query_config(config: &QueryConfig) -> Result<Self, QueryError> {
        match config.backend {
            QueryBackendType::ClickHouse => {
                let Some(url) = config.url.as_deref() else {
                    return Err(QueryError::Config(
                        "clickhouse backend needs a url".to_string(),
                    ));
                };

                let mut settings =
                    ClickHouseBackendConfig::new(url, config.database.as_deref().unwrap_or("default"))
                        .with_max_execution_time(config.max_execution_time);
                if let (Some(user), Some(pass)) = (&config.username, &config.password) {
                    settings = settings.with_credentials(user, pass);
                }

                Ok(Self::new(ClickHouseBackend::new(&settings)))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

#[async_trait::async_trait]
impl QueryBackend for QueryEngine {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        self.backend.execute(sql).await
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        self.backend.health_check().await
    }

    fn name(&self) -> &'static str {
        self.backend.name()
    }
}

/// How the CLI prints result rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text columns
    #[default]
    Table,
    /// Pretty-printed array of `{x, y, z}` objects
    Json,
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Table, Self::Json, Self::Csv]
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown format: {} (expected table, json or csv)", s))
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
