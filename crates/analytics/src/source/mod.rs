//! Data sources of joined view rows
//!
//! A [`ViewSource`] hands the engine view events left-joined to their
//! content item, author and country, already restricted by a [`ViewScan`].
//! Grouping, ranking and the lag pass happen in the engine, so a source
//! only has to filter.
//!
//! - [`MemoryStore`]: in-process tables, evaluates predicates per row
//! - [`SqlViewSource`]: renders the scan as SQL for any `QueryBackend`

pub mod memory;
pub mod sql;

pub use memory::{Fixture, MemoryStore};
pub use sql::SqlViewSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::filter::Predicate;
use crate::model::{ContentItem, ViewRow};
use inkstat_query::QueryError;

/// Restrictions applied to a view scan
#[derive(Debug, Clone, Copy)]
pub struct ViewScan<'a> {
    /// Compiled client filter
    pub predicate: &'a Predicate,
    /// Keep rows with `viewed_at >= since`
    pub since: Option<DateTime<Utc>>,
    /// Keep rows whose item was written by this author
    pub author_id: Option<u64>,
}

impl<'a> ViewScan<'a> {
    pub fn new(predicate: &'a Predicate) -> Self {
        Self {
            predicate,
            since: None,
            author_id: None,
        }
    }

    /// Set the lower bound on `viewed_at`
    pub fn since(mut self, since: impl Into<Option<DateTime<Utc>>>) -> Self {
        self.since = since.into();
        self
    }

    /// Restrict to one author
    pub fn author(mut self, author_id: impl Into<Option<u64>>) -> Self {
        self.author_id = author_id.into();
        self
    }

    /// Whether a joined row passes every restriction
    pub fn admits(&self, row: &ViewRow) -> bool {
        if let Some(since) = self.since
            && row.view.viewed_at < since
        {
            return false;
        }
        if let Some(author_id) = self.author_id
            && row.author_id() != Some(author_id)
        {
            return false;
        }
        self.predicate.matches(row)
    }
}

/// A queryable collection of joined view rows
#[async_trait]
pub trait ViewSource: Send + Sync {
    /// Joined view rows passing the scan, in a stable order
    async fn views(&self, scan: &ViewScan<'_>) -> Result<Vec<ViewRow>, QueryError>;

    /// Content items, optionally for one author
    async fn content_items(&self, author_id: Option<u64>) -> Result<Vec<ContentItem>, QueryError>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}
