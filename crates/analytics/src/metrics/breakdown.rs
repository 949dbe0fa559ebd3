//! Breakdown metric
//!
//! Views per (time bucket, author or country) within a lookback window.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AnalyticsError, Result};
use crate::filter::Predicate;
use crate::metrics::Metric;
use crate::model::ViewRow;
use crate::period::{BreakdownWindow, Period};
use crate::records::BreakdownRow;
use crate::source::{ViewScan, ViewSource};

/// What a breakdown groups by besides time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownDimension {
    /// Author's country name
    Country,
    /// Author's username
    Author,
}

impl BreakdownDimension {
    /// Parse a dimension token (`user` is accepted for `author`)
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "country" => Ok(Self::Country),
            "author" | "user" => Ok(Self::Author),
            _ => Err(AnalyticsError::InvalidDimension(s.to_string())),
        }
    }

    fn key(&self, row: &ViewRow) -> Option<String> {
        match self {
            Self::Country => row.country_name().map(str::to_string),
            Self::Author => row.username().map(str::to_string),
        }
    }
}

/// Breakdown metric
pub struct BreakdownMetric {
    dimension: BreakdownDimension,
    window: BreakdownWindow,
}

impl BreakdownMetric {
    pub fn new(dimension: BreakdownDimension, period: Period) -> Self {
        Self::for_window(dimension, BreakdownWindow::new(period))
    }

    pub fn for_window(dimension: BreakdownDimension, window: BreakdownWindow) -> Self {
        Self { dimension, window }
    }

    /// Group rows, ordered by bucket then key with missing keys last
    pub(crate) fn aggregate(&self, rows: &[ViewRow]) -> Vec<BreakdownRow> {
        #[derive(Default)]
        struct Group {
            items: HashSet<u64>,
            views: u64,
        }

        // (bucket, key missing, key): `false < true` puts missing keys last
        let mut groups: BTreeMap<(DateTime<Utc>, bool, Option<String>), Group> = BTreeMap::new();
        for row in rows {
            let bucket = self.window.period.truncate(row.view.viewed_at);
            let key = self.dimension.key(row);
            let group = groups.entry((bucket, key.is_none(), key)).or_default();
            group.items.insert(row.view.content_item_id);
            group.views += row.view.count;
        }

        groups
            .into_iter()
            .map(|((bucket, _, key), group)| BreakdownRow {
                bucket,
                key,
                item_count: group.items.len() as u64,
                view_total: group.views,
            })
            .collect()
    }
}

#[async_trait]
impl Metric for BreakdownMetric {
    type Output = Vec<BreakdownRow>;

    async fn execute(
        &self,
        source: &dyn ViewSource,
        predicate: &Predicate,
        now: DateTime<Utc>,
    ) -> Result<Vec<BreakdownRow>> {
        let scan = ViewScan::new(predicate).since(self.window.start(now));
        let rows = source.views(&scan).await?;
        Ok(self.aggregate(&rows))
    }

    fn name(&self) -> &'static str {
        "breakdown"
    }
}
