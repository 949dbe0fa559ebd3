//! SQL-backed view source
//!
//! Renders a [`ViewScan`] with the query builder, runs it on any
//! [`QueryBackend`] and decodes the result rows by column name.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::builder::{content_items_query, view_scan_query};
use crate::model::{Author, ContentItem, Country, ViewEvent, ViewRow};
use crate::period::parse_timestamp;
use crate::source::{ViewScan, ViewSource};
use inkstat_query::{QueryBackend, QueryError, QueryResult};

/// View source over a SQL backend
#[derive(Clone)]
pub struct SqlViewSource {
    backend: Arc<dyn QueryBackend>,
}

impl std::fmt::Debug for SqlViewSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlViewSource")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl SqlViewSource {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    pub fn from_backend(backend: impl QueryBackend + 'static) -> Self {
        Self::new(Arc::new(backend))
    }
}

#[async_trait]
impl ViewSource for SqlViewSource {
    async fn views(&self, scan: &ViewScan<'_>) -> Result<Vec<ViewRow>, QueryError> {
        let sql = view_scan_query(scan)?;
        let result = self.backend.execute(&sql).await?;

        tracing::debug!(
            backend = self.backend.name(),
            rows = result.row_count,
            time_ms = result.execution_time_ms,
            "view scan"
        );

        let columns = Columns::new(&result);
        result
            .rows
            .iter()
            .map(|row| decode_view_row(&columns, row))
            .collect()
    }

    async fn content_items(&self, author_id: Option<u64>) -> Result<Vec<ContentItem>, QueryError> {
        let sql = content_items_query(author_id);
        let result = self.backend.execute(&sql).await?;

        let columns = Columns::new(&result);
        result
            .rows
            .iter()
            .map(|row| {
                Ok(ContentItem {
                    id: columns.required_u64(row, "id")?,
                    title: columns.text(row, "title").unwrap_or_default(),
                    author_id: columns.u64(row, "author_id")?,
                    created_at: columns.required_time(row, "created_at")?,
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        self.backend.name()
    }
}

/// Rebuild a joined row from the scan's column aliases
///
/// Each join is present iff its defining column is non-null, which holds
/// for left joins on both ClickHouse (with `join_use_nulls`) and ANSI SQL.
fn decode_view_row(columns: &Columns<'_>, row: &[Value]) -> Result<ViewRow, QueryError> {
    let view = ViewEvent {
        id: columns.required_u64(row, "view_id")?,
        content_item_id: columns.required_u64(row, "blog_id")?,
        viewed_at: columns.required_time(row, "viewed_at")?,
        count: columns.required_u64(row, "count")?,
    };

    let author_id = columns.u64(row, "author_id")?;
    let country_id = columns.u64(row, "country_id")?;

    let item = match columns.time(row, "created_at")? {
        Some(created_at) => Some(ContentItem {
            id: view.content_item_id,
            title: columns.text(row, "title").unwrap_or_default(),
            author_id,
            created_at,
        }),
        None => None,
    };

    let author = match (author_id, columns.text(row, "username")) {
        (Some(id), Some(username)) => Some(Author {
            id,
            username,
            country_id,
        }),
        _ => None,
    };

    let country = match (country_id, columns.text(row, "country_name")) {
        (Some(id), Some(name)) => Some(Country { id, name }),
        _ => None,
    };

    Ok(ViewRow::new(view, item, author, country))
}

static NULL: Value = Value::Null;

/// Name-based access to result rows
struct Columns<'a> {
    result: &'a QueryResult,
}

impl<'a> Columns<'a> {
    fn new(result: &'a QueryResult) -> Self {
        Self { result }
    }

    fn get<'r>(&self, row: &'r [Value], name: &str) -> &'r Value {
        self.result
            .column_index(name)
            .and_then(|idx| row.get(idx))
            .unwrap_or(&NULL)
    }

    fn u64(&self, row: &[Value], name: &str) -> Result<Option<u64>, QueryError> {
        match self.get(row, name) {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(name, "not an unsigned integer")),
            Value::String(s) => s
                .parse()
                .map(Some)
                .map_err(|_| invalid(name, "not an unsigned integer")),
            _ => Err(invalid(name, "unexpected type")),
        }
    }

    fn required_u64(&self, row: &[Value], name: &str) -> Result<u64, QueryError> {
        self.u64(row, name)?.ok_or_else(|| invalid(name, "missing"))
    }

    fn time(&self, row: &[Value], name: &str) -> Result<Option<DateTime<Utc>>, QueryError> {
        match self.get(row, name) {
            Value::Null => Ok(None),
            Value::String(s) => parse_timestamp(s)
                .map(Some)
                .map_err(|_| invalid(name, "not a timestamp")),
            _ => Err(invalid(name, "unexpected type")),
        }
    }

    fn required_time(&self, row: &[Value], name: &str) -> Result<DateTime<Utc>, QueryError> {
        self.time(row, name)?.ok_or_else(|| invalid(name, "missing"))
    }

    fn text(&self, row: &[Value], name: &str) -> Option<String> {
        self.get(row, name).as_str().map(str::to_string)
    }
}

fn invalid(column: &str, reason: &str) -> QueryError {
    QueryError::InvalidRow(format!("column {}: {}", column, reason))
}

#[cfg(test)]
#[path = "sql_test.rs"]
mod sql_test;
