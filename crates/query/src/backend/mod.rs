//! Query backend trait and implementations

pub mod clickhouse;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::result::QueryResult;

/// Query backend trait
///
/// Anything that can run a read-only SQL statement and hand back rows.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute a SQL query
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError>;

    /// Check if backend is available
    async fn health_check(&self) -> Result<(), QueryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Reject anything that is not a single read-only statement
///
/// Analytics queries are generated, never user-typed, so this only guards
/// against a builder bug turning into a write.
pub fn validate_sql(sql: &str) -> Result<(), QueryError> {
    let stripped = strip_string_literals(sql);
    let trimmed = stripped.trim();
    let upper = trimmed.to_uppercase();

    if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
        return Err(QueryError::InvalidSql(
            "only SELECT and WITH queries are allowed".to_string(),
        ));
    }

    if upper.contains(" INTO ") {
        return Err(QueryError::InvalidSql(
            "SELECT INTO is not allowed".to_string(),
        ));
    }

    // Allow a trailing semicolon, nothing after it
    if trimmed.contains(';') && !trimmed.ends_with(';') {
        return Err(QueryError::InvalidSql(
            "multiple statements not allowed".to_string(),
        ));
    }

    Ok(())
}

/// Blank out the contents of single-quoted literals
///
/// Filter values end up inside literals and must not be mistaken for SQL.
fn strip_string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    for c in sql.chars() {
        if c == '\'' {
            in_literal = !in_literal;
            out.push(c);
        } else if !in_literal {
            out.push(c);
        }
    }
    out
}
