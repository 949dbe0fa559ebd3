//! inkstat Analytics Engine
//!
//! Page-view analytics over authored content.
//!
//! # Overview
//!
//! This crate is the analytical core of inkstat, built on top of `inkstat-query`.
//! It includes:
//!
//! - **Filters**: a JSON boolean AST (`and`/`or`/`not`/`eq`) compiled to a predicate
//! - **Periods**: day/week/month/year buckets, lookbacks and labels
//! - **Sources**: in-memory tables or SQL over any `QueryBackend`
//! - **Metrics**: breakdown, top-N ranking, period-over-period performance
//! - **Cache contract**: key derivation and TTLs for callers that memoize
//!
//! # Usage
//!
//! ```ignore
//! use inkstat_analytics::{AnalyticsEngine, BreakdownDimension, MemoryStore, Period, compile};
//!
//! let engine = AnalyticsEngine::new(Arc::new(MemoryStore::new()));
//!
//! let predicate = compile(Some(&json!({"eq": {"author.country.name": "Norway"}})));
//! let rows = engine
//!     .breakdown(BreakdownDimension::Author, Period::Month, &predicate)
//!     .await?;
//! ```

pub mod builder;
pub mod cache;
pub mod clock;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod period;
pub mod records;
pub mod source;


// Re-exports for convenience
pub use builder::QueryBuilder;
pub use cache::{CacheKey, CachePolicy, Operation, ResultCache, get_or_compute};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AnalyticsError, Result};
pub use filter::{Field, FilterExpr, Literal, Predicate, compile};
pub use metrics::{
    AnalyticsEngine, BreakdownDimension, BreakdownMetric, DEFAULT_TOP_N, Metric,
    PerformanceMetric, RankDimension, TopMetric,
};
pub use model::{Author, ContentItem, Country, ViewEvent, ViewRow};
pub use period::{BreakdownWindow, Period, parse_timestamp, range_lookback, since_for_range};
pub use records::{BreakdownRow, PerformanceRow, RankRow, growth_pct};
pub use source::{Fixture, MemoryStore, SqlViewSource, ViewScan, ViewSource};
