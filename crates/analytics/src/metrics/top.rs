//! Top-N metric
//!
//! Content items, authors or countries ranked by summed views.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AnalyticsError, Result};
use crate::filter::Predicate;
use crate::metrics::Metric;
use crate::model::ViewRow;
use crate::records::RankRow;
use crate::source::{ViewScan, ViewSource};

/// Default ranking length
pub const DEFAULT_TOP_N: usize = 10;

/// What a ranking ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDimension {
    ContentItem,
    Author,
    Country,
}

impl RankDimension {
    /// Parse a dimension token (`blog` is accepted for `content_item`, `user` for `author`)
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "content_item" | "item" | "blog" => Ok(Self::ContentItem),
            "author" | "user" => Ok(Self::Author),
            "country" => Ok(Self::Country),
            _ => Err(AnalyticsError::InvalidDimension(s.to_string())),
        }
    }
}

/// Top-N metric
pub struct TopMetric {
    dimension: RankDimension,
    n: usize,
    since: Option<DateTime<Utc>>,
}

impl TopMetric {
    pub fn new(dimension: RankDimension, n: usize) -> Self {
        Self {
            dimension,
            n,
            since: None,
        }
    }

    /// Only count views at or after `since`
    pub fn since(mut self, since: impl Into<Option<DateTime<Utc>>>) -> Self {
        self.since = since.into();
        self
    }

    /// Rank rows by summed views, descending
    ///
    /// Rows whose ranked join is missing are skipped. Groups start in
    /// ascending key order and the sort is stable, so equal totals keep
    /// that order.
    pub(crate) fn rank(&self, rows: &[ViewRow]) -> Vec<RankRow> {
        let mut ranked = match self.dimension {
            RankDimension::ContentItem => rank_items(rows),
            RankDimension::Author => rank_grouped(rows, |row| row.username()),
            RankDimension::Country => rank_grouped(rows, |row| row.country_name()),
        };

        ranked.sort_by(|a, b| b.view_total.cmp(&a.view_total));
        ranked.truncate(self.n);
        ranked
    }
}

/// Per item; `secondary` is the item id
fn rank_items(rows: &[ViewRow]) -> Vec<RankRow> {
    let mut groups: BTreeMap<u64, (String, u64)> = BTreeMap::new();
    for row in rows {
        let Some(item) = &row.item else {
            continue;
        };
        let entry = groups
            .entry(item.id)
            .or_insert_with(|| (item.title.clone(), 0));
        entry.1 += row.view.count;
    }

    groups
        .into_iter()
        .map(|(id, (title, views))| RankRow {
            key: title,
            secondary: id,
            view_total: views,
        })
        .collect()
}

/// Per author or country name; `secondary` is the distinct item count
fn rank_grouped<'a>(
    rows: &'a [ViewRow],
    key: impl Fn(&'a ViewRow) -> Option<&'a str>,
) -> Vec<RankRow> {
    let mut groups: BTreeMap<&str, (HashSet<u64>, u64)> = BTreeMap::new();
    for row in rows {
        let Some(name) = key(row) else {
            continue;
        };
        let entry = groups.entry(name).or_default();
        entry.0.insert(row.view.content_item_id);
        entry.1 += row.view.count;
    }

    groups
        .into_iter()
        .map(|(name, (items, views))| RankRow {
            key: name.to_string(),
            secondary: items.len() as u64,
            view_total: views,
        })
        .collect()
}

#[async_trait]
impl Metric for TopMetric {
    type Output = Vec<RankRow>;

    async fn execute(
        &self,
        source: &dyn ViewSource,
        predicate: &Predicate,
        _now: DateTime<Utc>,
    ) -> Result<Vec<RankRow>> {
        let scan = ViewScan::new(predicate).since(self.since);
        let rows = source.views(&scan).await?;
        Ok(self.rank(&rows))
    }

    fn name(&self) -> &'static str {
        "top"
    }
}
