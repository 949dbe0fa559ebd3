//! Integration tests for the analytics engine
//!
//! Drives the three operations end to end against a seeded `MemoryStore`
//! with the clock frozen at 2024-03-15 12:00 UTC (a Friday).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use inkstat_analytics::{
    AnalyticsEngine, AnalyticsError, Author, BreakdownDimension, BreakdownWindow, Clock, ContentItem, Country,
    FixedClock, MemoryStore, Period, Predicate, RankDimension, ViewEvent, compile,
};
use inkstat_query::QueryError;

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(at(2024, 3, 15, 12)))
}

/// Two countries, four authors, six items, seven view rows
///
/// | view | item | author | country | viewed_at        | count |
/// |------|------|--------|---------|------------------|-------|
/// | 1    | 100  | john   | Norway  | 2024-03-15 09:00 | 5     |
/// | 2    | 101  | john   | Norway  | 2024-02-20 10:00 | 3     |
/// | 3    | 102  | jane   | Norway  | 2024-03-15 11:00 | 1     |
/// | 4    | 103  | sven   | Sweden  | 2024-03-10 08:00 | 8     |
/// | 5    | 104  | anon   | -       | 2024-03-15 06:00 | 2     |
/// | 6    | 999  | -      | -       | 2024-03-15 07:00 | 4     |
/// | 7    | 105  | jane   | Norway  | 2024-01-20 10:00 | 6     |
fn seeded_store() -> MemoryStore {
    let store = MemoryStore::with_clock(clock());

    store.insert_country(Country {
        id: 1,
        name: "Norway".into(),
    });
    store.insert_country(Country {
        id: 2,
        name: "Sweden".into(),
    });

    for (id, username, country_id) in [
        (10, "john", Some(1)),
        (11, "jane", Some(1)),
        (12, "sven", Some(2)),
        (13, "anon", None),
    ] {
        store.insert_author(Author {
            id,
            username: username.into(),
            country_id,
        });
    }

    for (id, title, author_id, created_at) in [
        (100, "Rust tips", 10, at(2024, 1, 5, 0)),
        (101, "Async", 10, at(2024, 2, 10, 0)),
        (102, "Fjords", 11, at(2024, 3, 1, 0)),
        (103, "Meatballs", 12, at(2024, 3, 12, 0)),
        (104, "Untitled", 13, at(2024, 3, 14, 0)),
        (105, "Old news", 11, at(2023, 12, 1, 0)),
    ] {
        store.insert_item(ContentItem {
            id,
            title: title.into(),
            author_id: Some(author_id),
            created_at,
        });
    }

    for (id, item, viewed_at, count) in [
        (1, 100, at(2024, 3, 15, 9), 5),
        (2, 101, at(2024, 2, 20, 10), 3),
        (3, 102, at(2024, 3, 15, 11), 1),
        (4, 103, at(2024, 3, 10, 8), 8),
        (5, 104, at(2024, 3, 15, 6), 2),
        (6, 999, at(2024, 3, 15, 7), 4),
        (7, 105, at(2024, 1, 20, 10), 6),
    ] {
        store.insert_view(ViewEvent {
            id,
            content_item_id: item,
            viewed_at,
            count,
        });
    }

    store
}

fn engine_for(store: MemoryStore) -> AnalyticsEngine {
    AnalyticsEngine::new(Arc::new(store)).with_clock(clock())
}

fn engine() -> AnalyticsEngine {
    engine_for(seeded_store())
}

// =============================================================================
// Breakdown
// =============================================================================

#[tokio::test]
async fn test_breakdown_by_author_daily() {
    let rows = engine()
        .breakdown(BreakdownDimension::Author, Period::Day, &Predicate::All)
        .await
        .unwrap();

    let keys: Vec<Option<&str>> = rows.iter().map(|r| r.key.as_deref()).collect();
    assert_eq!(keys, vec![Some("anon"), Some("jane"), Some("john"), None]);

    let john = &rows[2];
    assert_eq!(john.item_count, 1);
    assert_eq!(john.view_total, 5);
    assert!(rows.iter().all(|r| r.bucket == at(2024, 3, 15, 0)));
}

#[tokio::test]
async fn test_breakdown_unknown_period_looks_back_a_week() {
    let window = BreakdownWindow::from_token("quarter");
    let rows = engine()
        .breakdown_window(BreakdownDimension::Author, window, &Predicate::All)
        .await
        .unwrap();

    // Day buckets reaching back to sven's view on the 10th
    let summary: Vec<(DateTime<Utc>, Option<&str>)> = rows
        .iter()
        .map(|r| (r.bucket, r.key.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (at(2024, 3, 10, 0), Some("sven")),
            (at(2024, 3, 15, 0), Some("anon")),
            (at(2024, 3, 15, 0), Some("jane")),
            (at(2024, 3, 15, 0), Some("john")),
            (at(2024, 3, 15, 0), None),
        ]
    );
    assert_eq!(rows[0].view_total, 8);
}

#[tokio::test]
async fn test_breakdown_partitions_qualifying_rows() {
    // Rows inside the 30-day lookback: views 1-6
    let rows = engine()
        .breakdown(BreakdownDimension::Country, Period::Month, &Predicate::All)
        .await
        .unwrap();

    let total: u64 = rows.iter().map(|r| r.view_total).sum();
    assert_eq!(total, 5 + 3 + 1 + 8 + 2 + 4);

    let summary: Vec<(DateTime<Utc>, Option<&str>, u64, u64)> = rows
        .iter()
        .map(|r| (r.bucket, r.key.as_deref(), r.item_count, r.view_total))
        .collect();
    assert_eq!(
        summary,
        vec![
            (at(2024, 2, 1, 0), Some("Norway"), 1, 3),
            (at(2024, 3, 1, 0), Some("Norway"), 2, 6),
            (at(2024, 3, 1, 0), Some("Sweden"), 1, 8),
            (at(2024, 3, 1, 0), None, 2, 6),
        ]
    );
}

#[tokio::test]
async fn test_breakdown_applies_filter() {
    let predicate = compile(Some(&json!({"not": {"eq": {"country.name": "Norway"}}})));
    let rows = engine()
        .breakdown(BreakdownDimension::Author, Period::Week, &predicate)
        .await
        .unwrap();

    // Week lookback keeps views 1, 3, 4, 5, 6 and the filter drops the
    // Norwegian 1 and 3. Rows without a country are not equal to Norway.
    let summary: Vec<(DateTime<Utc>, Option<&str>)> =
        rows.iter().map(|r| (r.bucket, r.key.as_deref())).collect();
    assert_eq!(
        summary,
        vec![
            (at(2024, 3, 4, 0), Some("sven")),
            (at(2024, 3, 11, 0), Some("anon")),
            (at(2024, 3, 11, 0), None),
        ]
    );
}

#[tokio::test]
async fn test_breakdown_sees_recorded_views() {
    let store = seeded_store();
    store.record_view(102).unwrap();
    store.record_view(102).unwrap();
    let engine = engine_for(store);

    let predicate = compile(Some(&json!({"eq": {"author.username": "jane"}})));
    let rows = engine
        .breakdown(BreakdownDimension::Author, Period::Day, &predicate)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].view_total, 3);
}

// =============================================================================
// Top
// =============================================================================

#[tokio::test]
async fn test_top_authors_non_increasing_and_bounded() {
    let rows = engine()
        .top_in_range(RankDimension::Author, 2, &Predicate::All, None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows.windows(2).all(|w| w[0].view_total >= w[1].view_total));
    // john and sven tie on 8; ties keep ascending name order
    let names: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(names, vec!["john", "sven"]);
    assert_eq!(rows[0].secondary, 2);
}

#[tokio::test]
async fn test_top_countries() {
    let rows = engine()
        .top_in_range(RankDimension::Country, 10, &Predicate::All, Some("last_30_days"))
        .await
        .unwrap();

    let summary: Vec<(&str, u64, u64)> = rows
        .iter()
        .map(|r| (r.key.as_str(), r.secondary, r.view_total))
        .collect();
    assert_eq!(summary, vec![("Norway", 3, 9), ("Sweden", 1, 8)]);
}

#[tokio::test]
async fn test_top_items_in_range_token() {
    let rows = engine()
        .top_in_range(RankDimension::ContentItem, 10, &Predicate::All, Some("foo_7_days_bar"))
        .await
        .unwrap();

    let ids: Vec<u64> = rows.iter().map(|r| r.secondary).collect();
    assert_eq!(ids, vec![103, 100, 104, 102]);
    assert_eq!(rows[0].key, "Meatballs");
}

/// Frozen clock that counts how often it is read
#[derive(Debug)]
struct CountingClock {
    now: DateTime<Utc>,
    reads: AtomicUsize,
}

impl Clock for CountingClock {
    fn now(&self) -> DateTime<Utc> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.now
    }
}

#[tokio::test]
async fn test_top_in_range_reads_clock_once() {
    let counting = Arc::new(CountingClock {
        now: at(2024, 3, 15, 12),
        reads: AtomicUsize::new(0),
    });
    let engine = AnalyticsEngine::new(Arc::new(seeded_store())).with_clock(counting.clone());

    let rows = engine
        .top_in_range(RankDimension::Country, 10, &Predicate::All, Some("last_7_days"))
        .await
        .unwrap();

    assert_eq!(counting.reads.load(Ordering::SeqCst), 1);
    let names: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(names, vec!["Sweden", "Norway"]);
}

#[tokio::test]
async fn test_top_without_cutoff_sees_everything() {
    let rows = engine()
        .top(RankDimension::Author, 10, &Predicate::All, None)
        .await
        .unwrap();

    let jane = rows.iter().find(|r| r.key == "jane").unwrap();
    assert_eq!(jane.view_total, 7);
    assert_eq!(jane.secondary, 2);
}

#[tokio::test]
async fn test_top_items_three_items_two_authors() {
    let store = MemoryStore::with_clock(clock());
    store.insert_country(Country {
        id: 1,
        name: "Norway".into(),
    });
    for (id, username) in [(1, "a"), (2, "b")] {
        store.insert_author(Author {
            id,
            username: username.into(),
            country_id: Some(1),
        });
    }
    for (id, author, count) in [(10, 1, 5), (11, 1, 3), (12, 2, 1)] {
        store.insert_item(ContentItem {
            id,
            title: format!("post {}", id),
            author_id: Some(author),
            created_at: at(2024, 3, 1, 0),
        });
        store.insert_view(ViewEvent {
            id,
            content_item_id: id,
            viewed_at: at(2024, 3, 14, 0),
            count,
        });
    }

    let rows = engine_for(store)
        .top_in_range(RankDimension::ContentItem, 2, &Predicate::All, None)
        .await
        .unwrap();

    let summary: Vec<(u64, u64)> = rows.iter().map(|r| (r.secondary, r.view_total)).collect();
    assert_eq!(summary, vec![(10, 5), (11, 3)]);
}

// =============================================================================
// Performance
// =============================================================================

#[tokio::test]
async fn test_performance_monthly() {
    let rows = engine()
        .performance(Period::Month, None, &Predicate::All)
        .await
        .unwrap();

    let summary: Vec<(&str, u64, f64)> = rows
        .iter()
        .map(|r| (r.label.as_str(), r.view_total, r.growth_pct))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("January 2024 (1 blogs)", 6, 100.0),
            ("February 2024 (1 blogs)", 3, -50.0),
            ("March 2024 (3 blogs)", 20, 566.67),
        ]
    );
}

#[tokio::test]
async fn test_performance_for_author() {
    let rows = engine()
        .performance(Period::Month, Some(10), &Predicate::All)
        .await
        .unwrap();

    let summary: Vec<(&str, u64, f64)> = rows
        .iter()
        .map(|r| (r.label.as_str(), r.view_total, r.growth_pct))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("February 2024 (1 blogs)", 3, 100.0),
            ("March 2024 (0 blogs)", 5, 66.67),
        ]
    );
}

#[tokio::test]
async fn test_performance_weekly_labels() {
    let rows = engine()
        .performance(Period::Week, Some(11), &Predicate::All)
        .await
        .unwrap();

    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Jan 15, 2024 (0 blogs)", "Mar 11, 2024 (0 blogs)"]);
}

#[tokio::test]
async fn test_performance_filter_restricts_views_only() {
    let predicate = compile(Some(&json!({"eq": {"blog__author__country__name": "Sweden"}})));
    let rows = engine()
        .performance(Period::Month, None, &predicate)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].view_total, 8);
    assert_eq!(rows[0].label, "March 2024 (3 blogs)");
}

// =============================================================================
// Errors and concurrency
// =============================================================================

#[tokio::test]
async fn test_unknown_field_fails_the_operation() {
    let predicate = compile(Some(&json!({"eq": {"author.email": "a@b.c"}})));
    let err = engine()
        .top(RankDimension::Author, 10, &predicate, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalyticsError::Backend(QueryError::InvalidField(_))
    ));
}

#[tokio::test]
async fn test_malformed_filter_matches_everything() {
    let engine = engine();
    let malformed = compile(Some(&json!({"between": [1, 2]})));

    let filtered = engine
        .top(RankDimension::ContentItem, 10, &malformed, None)
        .await
        .unwrap();
    let unfiltered = engine
        .top(RankDimension::ContentItem, 10, &Predicate::All, None)
        .await
        .unwrap();
    assert_eq!(filtered, unfiltered);
}

#[tokio::test]
async fn test_concurrent_operations_are_deterministic() {
    let engine = engine();
    let predicate = compile(Some(&json!({"eq": {"country.name": "Norway"}})));

    let (a, b, c) = tokio::join!(
        engine.breakdown(BreakdownDimension::Author, Period::Month, &predicate),
        engine.top(RankDimension::Author, 10, &predicate, None),
        engine.performance(Period::Month, None, &predicate),
    );

    assert_eq!(
        a.unwrap(),
        engine
            .breakdown(BreakdownDimension::Author, Period::Month, &predicate)
            .await
            .unwrap()
    );
    assert_eq!(
        b.unwrap(),
        engine.top(RankDimension::Author, 10, &predicate, None).await.unwrap()
    );
    assert_eq!(
        c.unwrap(),
        engine.performance(Period::Month, None, &predicate).await.unwrap()
    );
}
