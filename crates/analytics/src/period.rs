//! Time periods, bucketing and lookback windows
//!
//! One place for every calendar policy the operations share:
//! - bucket boundaries (`truncate`): weeks start on Monday
//! - lookback widths for breakdowns (`lookback`, `BreakdownWindow`)
//! - human labels for performance rows (`label`)
//! - free-text range tokens for rankings (`range_lookback`)

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Lookback used when a range token is missing or unrecognized
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Breakdown lookback used when the period token is unrecognized
pub const FALLBACK_BREAKDOWN_DAYS: i64 = 7;

/// Bucketing granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// Parse a period token, rejecting unknown values
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" | "1d" => Ok(Self::Day),
            "week" | "weekly" | "1w" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" | "1y" => Ok(Self::Year),
            _ => Err(AnalyticsError::InvalidPeriod(s.to_string())),
        }
    }

    /// Parse a period token, falling back to [`Period::Day`]
    pub fn from_token(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|_| {
            tracing::debug!(token = s, "unknown period, using day");
            Self::Day
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// How far back a breakdown over this period looks
    pub fn lookback(&self) -> Duration {
        match self {
            Self::Day => Duration::days(1),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Year => Duration::days(365),
        }
    }

    /// Start of the bucket containing `ts`
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            Self::Day => date,
            Self::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Self::Month => date - Days::new(u64::from(date.day0())),
            Self::Year => date - Days::new(u64::from(date.ordinal0())),
        };
        start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Human label of a bucket
    ///
    /// Month: `January 2024`, week: `Jan 01, 2024`, day: `January 01, 2024`,
    /// year: `2024`.
    pub fn label(&self, bucket: DateTime<Utc>) -> String {
        let fmt = match self {
            Self::Day => "%B %d, %Y",
            Self::Week => "%b %d, %Y",
            Self::Month => "%B %Y",
            Self::Year => "%Y",
        };
        bucket.format(fmt).to_string()
    }
}

/// Bucket granularity and lookback of one breakdown
///
/// A known period looks back over its own width. An unknown token still
/// buckets by day but looks back [`FALLBACK_BREAKDOWN_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownWindow {
    pub period: Period,
    pub lookback: Duration,
}

impl BreakdownWindow {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            lookback: period.lookback(),
        }
    }

    /// Resolve a period token into a window
    pub fn from_token(s: &str) -> Self {
        match Period::parse(s) {
            Ok(period) => Self::new(period),
            Err(_) => {
                tracing::debug!(
                    token = s,
                    days = FALLBACK_BREAKDOWN_DAYS,
                    "unknown period, using day buckets"
                );
                Self {
                    period: Period::Day,
                    lookback: Duration::days(FALLBACK_BREAKDOWN_DAYS),
                }
            }
        }
    }

    /// Earliest `viewed_at` the breakdown keeps
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.lookback
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Resolve a free-text range token to a lookback width
///
/// Matching is a case-insensitive substring test in priority order, so
/// `last_7_days` and `foo_7_days_bar` both mean seven days. Anything
/// unrecognized, including no token at all, means thirty days.
pub fn range_lookback(token: Option<&str>) -> Duration {
    let Some(token) = token else {
        return Duration::days(DEFAULT_RANGE_DAYS);
    };
    let token = token.to_lowercase();

    let days = if token.contains("7_days") {
        7
    } else if token.contains("30_days") {
        30
    } else if token.contains("90_days") {
        90
    } else if token.contains("last_year") || token.contains("365_days") {
        365
    } else if token.contains("last_week") {
        7
    } else if token.contains("last_month") {
        30
    } else {
        DEFAULT_RANGE_DAYS
    };

    Duration::days(days)
}

/// Cutoff for a ranking given a range token
pub fn since_for_range(token: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    now - range_lookback(token)
}

/// Parse an explicit cutoff timestamp
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (UTC) or a bare date
/// (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.and_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ts.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(AnalyticsError::InvalidTimeRange(format!(
        "unrecognized timestamp: {}",
        s
    )))
}
