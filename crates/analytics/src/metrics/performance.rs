//! Performance metric
//!
//! Views per time bucket, each compared with the bucket before it, plus
//! how many content items were created in the bucket.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::filter::Predicate;
use crate::metrics::Metric;
use crate::model::{ContentItem, ViewRow};
use crate::period::Period;
use crate::records::{PerformanceRow, growth_pct};
use crate::source::{ViewScan, ViewSource};

/// Performance metric
pub struct PerformanceMetric {
    period: Period,
    author_id: Option<u64>,
}

impl PerformanceMetric {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            author_id: None,
        }
    }

    /// Restrict views and created items to one author
    pub fn for_author(mut self, author_id: impl Into<Option<u64>>) -> Self {
        self.author_id = author_id.into();
        self
    }

    /// Bucket views, run the lag pass and merge in created items
    ///
    /// Only buckets with views produce rows; the lag compares with the
    /// previous such bucket, not the previous calendar period.
    pub(crate) fn compare(&self, rows: &[ViewRow], items: &[ContentItem]) -> Vec<PerformanceRow> {
        let mut buckets: BTreeMap<DateTime<Utc>, (HashSet<u64>, u64)> = BTreeMap::new();
        for row in rows {
            let entry = buckets
                .entry(self.period.truncate(row.view.viewed_at))
                .or_default();
            entry.0.insert(row.view.content_item_id);
            entry.1 += row.view.count;
        }

        let mut created: HashMap<DateTime<Utc>, u64> = HashMap::new();
        for item in items {
            *created
                .entry(self.period.truncate(item.created_at))
                .or_default() += 1;
        }

        let mut previous: Option<u64> = None;
        buckets
            .into_iter()
            .map(|(bucket, (distinct, views))| {
                let items_created = created.get(&bucket).copied().unwrap_or(0);
                let row = PerformanceRow {
                    bucket,
                    label: format!("{} ({} blogs)", self.period.label(bucket), items_created),
                    view_total: views,
                    growth_pct: growth_pct(views, previous),
                    item_count: distinct.len() as u64,
                    items_created,
                    previous_view_total: previous,
                };
                previous = Some(views);
                row
            })
            .collect()
    }
}

#[async_trait]
impl Metric for PerformanceMetric {
    type Output = Vec<PerformanceRow>;

    async fn execute(
        &self,
        source: &dyn ViewSource,
        predicate: &Predicate,
        _now: DateTime<Utc>,
    ) -> Result<Vec<PerformanceRow>> {
        let scan = ViewScan::new(predicate).author(self.author_id);
        let rows = source.views(&scan).await?;
        let items = source.content_items(self.author_id).await?;
        Ok(self.compare(&rows, &items))
    }

    fn name(&self) -> &'static str {
        "performance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViewEvent;
    use chrono::TimeZone;

    fn view(item: u64, month: u32, count: u64) -> ViewRow {
        ViewRow::new(
            ViewEvent {
                id: item,
                content_item_id: item,
                viewed_at: Utc.with_ymd_and_hms(2024, month, 10, 0, 0, 0).unwrap(),
                count,
            },
            None,
            None,
            None,
        )
    }

    fn item(id: u64, month: u32) -> ContentItem {
        ContentItem {
            id,
            title: format!("post {}", id),
            author_id: Some(1),
            created_at: Utc.with_ymd_and_hms(2024, month, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_lag_and_growth() {
        let rows = vec![view(1, 1, 0), view(2, 2, 10), view(3, 3, 5)];
        let out = PerformanceMetric::new(Period::Month).compare(&rows, &[]);

        let growth: Vec<f64> = out.iter().map(|r| r.growth_pct).collect();
        assert_eq!(growth, vec![0.0, 100.0, -50.0]);
        assert_eq!(out[0].previous_view_total, None);
        assert_eq!(out[1].previous_view_total, Some(0));
        assert_eq!(out[2].previous_view_total, Some(10));
    }

    #[test]
    fn test_labels_merge_created_items() {
        let rows = vec![view(1, 1, 4), view(2, 1, 6), view(3, 3, 1)];
        let items = vec![item(1, 1), item(2, 1), item(9, 2)];
        let out = PerformanceMetric::new(Period::Month).compare(&rows, &items);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label, "January 2024 (2 blogs)");
        assert_eq!(out[0].view_total, 10);
        assert_eq!(out[0].item_count, 2);
        // No item was created in March
        assert_eq!(out[1].label, "March 2024 (0 blogs)");
        assert_eq!(out[1].growth_pct, -90.0);
    }

    #[test]
    fn test_yearly_label() {
        let out = PerformanceMetric::new(Period::Year).compare(&[view(1, 5, 3)], &[item(1, 1)]);
        assert_eq!(out[0].label, "2024 (1 blogs)");
        assert_eq!(out[0].growth_pct, 100.0);
    }
}
