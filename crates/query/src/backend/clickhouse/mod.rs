//! ClickHouse backend for the view-event tables
//!
//! Executes generated SQL against a ClickHouse database using the HTTP interface.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::backend::{QueryBackend, validate_sql};
use crate::error::QueryError;
use crate::result::QueryResult;

// =============================================================================
// Configuration
// =============================================================================

/// ClickHouse backend configuration
#[derive(Debug, Clone)]
pub struct ClickHouseBackendConfig {
    /// ClickHouse HTTP URL (e.g., "http://localhost:8123")
    pub url: String,

    /// Database holding the analytics tables
    pub database: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,

    /// Server-side max execution time in seconds
    pub max_execution_time: u64,
}

impl Default for ClickHouseBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: None,
            password: None,
            max_execution_time: 60,
        }
    }
}

impl ClickHouseBackendConfig {
    /// Create a new config with URL and database
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
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

    /// Set the server-side execution limit
    pub fn with_max_execution_time(mut self, seconds: u64) -> Self {
        self.max_execution_time = seconds;
        self
    }
}

// =============================================================================
// Backend Implementation
// =============================================================================

/// ClickHouse backend for SQL queries using HTTP interface
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: reqwest::Client,
    config: ClickHouseBackendConfig,
}

impl std::fmt::Debug for ClickHouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .finish()
    }
}

impl ClickHouseBackend {
    /// Create a new ClickHouse backend from config
    pub fn new(config: &ClickHouseBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Create from URL and database directly
    pub fn from_url(url: impl Into<String>, database: impl Into<String>) -> Self {
        let config = ClickHouseBackendConfig::new(url, database);
        Self::new(&config)
    }

    /// HTTP interface settings sent with every query
    ///
    /// 64-bit integers are requested unquoted so ids and counts decode as
    /// JSON numbers, and outer joins yield NULL rather than column defaults.
    fn settings(&self) -> [(&'static str, String); 4] {
        [
            ("database", self.config.database.clone()),
            ("max_execution_time", self.config.max_execution_time.to_string()),
            ("output_format_json_quote_64bit_integers", "0".to_string()),
            ("join_use_nulls", "1".to_string()),
        ]
    }

    /// POST a statement and get the raw response body
    async fn post(&self, sql: String) -> Result<String, QueryError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .query(&self.settings())
            .body(sql);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await.map_err(|e| {
            QueryError::Connection(format!("ClickHouse connection failed: {}", e))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Execution(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(QueryError::Execution(format!(
                "ClickHouse error ({}): {}",
                status,
                body.trim()
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl QueryBackend for ClickHouseBackend {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        validate_sql(sql)?;

        let start = Instant::now();

        let statement = format!("{} FORMAT JSONEachRow", sql.trim().trim_end_matches(';'));
        let body = self.post(statement).await?;

        let execution_time_ms = start.elapsed().as_millis() as u64;

        let result = parse_json_each_row(&body, execution_time_ms)?;

        tracing::debug!(
            rows = result.row_count,
            cols = result.columns.len(),
            time_ms = execution_time_ms,
            "ClickHouse query executed"
        );

        Ok(result)
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        self.post("SELECT 1".to_string()).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

/// Parse a `JSONEachRow` body into a [`QueryResult`]
///
/// The first row names the columns. Every row is read by those names, with
/// a missing key read as NULL.
fn parse_json_each_row(body: &str, execution_time_ms: u64) -> Result<QueryResult, QueryError> {
    let mut objects = Vec::new();
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        let object: Map<String, Value> = serde_json::from_str(line)
            .map_err(|e| QueryError::Serialization(format!("bad JSONEachRow line: {}", e)))?;
        objects.push(object);
    }

    let columns: Vec<String> = objects
        .first()
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|name| object.get(name).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(QueryResult::new(columns, rows, execution_time_ms))
}
