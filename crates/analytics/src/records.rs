//! Result records of the three operations
//!
//! Each record serializes positionally as `{x, y, z}`, the shape callers
//! chart directly. Grouping keys that only matter for ordering are kept on
//! the struct but skipped in the output.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One (bucket, dimension) group of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    #[serde(skip)]
    pub bucket: DateTime<Utc>,
    /// Author username or country name; `None` when the join is missing
    #[serde(rename = "x")]
    pub key: Option<String>,
    /// Distinct content items in the group
    #[serde(rename = "y")]
    pub item_count: u64,
    /// Summed view count
    #[serde(rename = "z")]
    pub view_total: u64,
}

/// One entry of a top-N ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRow {
    /// Item title, author username or country name
    #[serde(rename = "x")]
    pub key: String,
    /// Item id for item rankings, distinct item count otherwise
    #[serde(rename = "y")]
    pub secondary: u64,
    #[serde(rename = "z")]
    pub view_total: u64,
}

/// One bucket of a performance comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRow {
    #[serde(skip)]
    pub bucket: DateTime<Utc>,
    /// e.g. `March 2024 (4 blogs)`
    #[serde(rename = "x")]
    pub label: String,
    #[serde(rename = "y")]
    pub view_total: u64,
    /// Change against the previous bucket, in percent
    #[serde(rename = "z")]
    pub growth_pct: f64,
    #[serde(skip)]
    pub item_count: u64,
    #[serde(skip)]
    pub items_created: u64,
    #[serde(skip)]
    pub previous_view_total: Option<u64>,
}

/// Period-over-period growth in percent, rounded to two decimals
///
/// Rounding works on the exact binary value with ties going to the even
/// digit, so `-90.625` becomes `-90.62`. Without a positive baseline the
/// growth is 100 when there are views and 0 otherwise.
pub fn growth_pct(current: u64, previous: Option<u64>) -> f64 {
    match previous {
        Some(prev) if prev > 0 => {
            let pct = (current as f64 - prev as f64) / prev as f64 * 100.0;
            format!("{:.2}", pct).parse().unwrap_or(pct)
        }
        _ if current > 0 => 100.0,
        _ => 0.0,
    }
}
