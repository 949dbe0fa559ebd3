//! Metrics engine for view analytics
//!
//! Three operations over joined view rows:
//!
//! - **breakdown**: views per time bucket and author or country
//! - **top**: top-N content items, authors or countries by views
//! - **performance**: views per bucket with period-over-period growth
//!
//! Sources only filter. Grouping, ordering and the lag pass over sorted
//! buckets run here, so every source yields identical results.

pub mod breakdown;
pub mod performance;
pub mod top;

pub use breakdown::{BreakdownDimension, BreakdownMetric};
pub use performance::PerformanceMetric;
pub use top::{DEFAULT_TOP_N, RankDimension, TopMetric};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::filter::Predicate;
use crate::period::{BreakdownWindow, Period, since_for_range};
use crate::records::{BreakdownRow, PerformanceRow, RankRow};
use crate::source::ViewSource;

/// An aggregation that can be executed against a view source
#[async_trait]
pub trait Metric: Send + Sync {
    /// Records produced, already ordered
    type Output: Send;

    /// Execute this metric as of `now`
    async fn execute(
        &self,
        source: &dyn ViewSource,
        predicate: &Predicate,
        now: DateTime<Utc>,
    ) -> Result<Self::Output>;

    /// Get the metric name for logging/identification
    fn name(&self) -> &'static str;
}

/// Analytics engine running metrics against one source
///
/// Holds no mutable state; any number of operations may run concurrently.
#[derive(Clone)]
pub struct AnalyticsEngine {
    source: Arc<dyn ViewSource>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AnalyticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsEngine")
            .field("source", &self.source.name())
            .field("clock", &self.clock)
            .finish()
    }
}

impl AnalyticsEngine {
    /// Create an engine reading the wall clock
    pub fn new(source: Arc<dyn ViewSource>) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the source name
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Execute a metric with the engine's clock
    pub async fn execute<M: Metric>(&self, metric: &M, predicate: &Predicate) -> Result<M::Output> {
        self.execute_at(metric, predicate, self.clock.now()).await
    }

    /// Execute a metric at a given instant
    async fn execute_at<M: Metric>(
        &self,
        metric: &M,
        predicate: &Predicate,
        now: DateTime<Utc>,
    ) -> Result<M::Output> {
        let start = Instant::now();

        let output = metric.execute(self.source.as_ref(), predicate, now).await;

        tracing::debug!(
            metric = metric.name(),
            source = self.source.name(),
            ok = output.is_ok(),
            time_ms = start.elapsed().as_millis() as u64,
            "metric executed"
        );
        output
    }

    /// Views per time bucket and author or country
    pub async fn breakdown(
        &self,
        dimension: BreakdownDimension,
        period: Period,
        predicate: &Predicate,
    ) -> Result<Vec<BreakdownRow>> {
        self.breakdown_window(dimension, BreakdownWindow::new(period), predicate)
            .await
    }

    /// Breakdown with an explicit bucket granularity and lookback
    pub async fn breakdown_window(
        &self,
        dimension: BreakdownDimension,
        window: BreakdownWindow,
        predicate: &Predicate,
    ) -> Result<Vec<BreakdownRow>> {
        let metric = BreakdownMetric::for_window(dimension, window);
        self.execute(&metric, predicate).await
    }

    /// Top `n` entities by views since an explicit cutoff
    pub async fn top(
        &self,
        dimension: RankDimension,
        n: usize,
        predicate: &Predicate,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RankRow>> {
        let metric = TopMetric::new(dimension, n).since(since);
        self.execute(&metric, predicate).await
    }

    /// Top `n` entities by views within a free-text range token
    ///
    /// See [`range_lookback`](crate::period::range_lookback) for the tokens.
    pub async fn top_in_range(
        &self,
        dimension: RankDimension,
        n: usize,
        predicate: &Predicate,
        range: Option<&str>,
    ) -> Result<Vec<RankRow>> {
        let now = self.clock.now();
        let metric = TopMetric::new(dimension, n).since(Some(since_for_range(range, now)));
        self.execute_at(&metric, predicate, now).await
    }

    /// Views per bucket with growth against the previous bucket
    pub async fn performance(
        &self,
        period: Period,
        author_id: Option<u64>,
        predicate: &Predicate,
    ) -> Result<Vec<PerformanceRow>> {
        let metric = PerformanceMetric::new(period).for_author(author_id);
        self.execute(&metric, predicate).await
    }
}
