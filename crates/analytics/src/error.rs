//! Analytics error types

use thiserror::Error;

/// Analytics errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Unknown period token (strict parsing only)
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Unknown breakdown or ranking dimension
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// Invalid time range
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Data source error (from inkstat-query)
    #[error("backend error: {0}")]
    Backend(#[from] inkstat_query::QueryError),
}

/// Result type for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
