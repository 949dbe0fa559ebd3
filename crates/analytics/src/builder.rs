//! Query builder for generating SQL from compiled predicates
//!
//! Builds the joined view-row scan that [`SqlViewSource`](crate::source::SqlViewSource)
//! runs:
//! - views left-joined to items, authors and countries
//! - the lookback cutoff and author restriction
//! - the compiled filter as a WHERE clause
//!
//! Grouping happens in the engine, so the generated SQL never aggregates.

use chrono::{DateTime, Utc};

use crate::filter::{Literal, Predicate};
use crate::source::ViewScan;
use inkstat_query::QueryError;

/// View events, one row per content item
pub const VIEWS_TABLE: &str = "analytics_blogview";
/// Content items
pub const ITEMS_TABLE: &str = "analytics_blog";
/// Authors
pub const AUTHORS_TABLE: &str = "analytics_user";
/// Countries
pub const COUNTRIES_TABLE: &str = "analytics_country";

/// Query builder for analytics SQL
pub struct QueryBuilder {
    table: String,
    joins: Vec<String>,
    select: Vec<String>,
    where_clauses: Vec<String>,
    order_by: Vec<String>,
}

impl QueryBuilder {
    /// Create a new query builder for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
            select: Vec::new(),
            where_clauses: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Add a LEFT JOIN
    pub fn left_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins
            .push(format!("LEFT JOIN {} ON {}", table.into(), on.into()));
        self
    }

    /// Add a SELECT column
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.select.push(column.into());
        self
    }

    /// Add a SELECT column with alias
    pub fn select_as(mut self, expr: impl Into<String>, alias: impl Into<String>) -> Self {
        self.select.push(format!("{} AS {}", expr.into(), alias.into()));
        self
    }

    /// Add a WHERE clause
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clauses.push(clause.into());
        self
    }

    /// Add an ORDER BY column
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Apply a compiled predicate as a WHERE clause
    pub fn apply_predicate(self, predicate: &Predicate) -> Result<Self, QueryError> {
        Ok(match predicate_to_sql(predicate)? {
            Some(clause) => self.where_clause(clause),
            None => self,
        })
    }

    /// Build the final SQL query
    pub fn build(self) -> String {
        let mut sql = String::new();

        // SELECT
        sql.push_str("SELECT ");
        if self.select.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select.join(", "));
        }

        // FROM
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        // JOIN
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        // WHERE
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        sql
    }
}

/// Render a predicate as a WHERE clause
///
/// Returns `None` for the match-all predicate and an error for invalid leaves.
pub fn predicate_to_sql(predicate: &Predicate) -> Result<Option<String>, QueryError> {
    match predicate {
        Predicate::All => Ok(None),
        Predicate::Invalid(reason) => Err(QueryError::InvalidField(reason.clone())),
        Predicate::Eq(eq) => {
            let column = eq.field.column();
            Ok(Some(match &eq.value {
                Literal::Null => format!("{} IS NULL", column),
                // Two-valued on joined columns so NOT keeps rows whose join
                // is missing, matching in-memory evaluation
                literal if eq.field.nullable() => format!(
                    "({} = {} AND {} IS NOT NULL)",
                    column,
                    literal_to_sql(literal),
                    column
                ),
                literal => format!("{} = {}", column, literal_to_sql(literal)),
            }))
        }
        Predicate::Not(inner) => {
            Ok(predicate_to_sql(inner)?.map(|clause| format!("NOT ({})", clause)))
        }
        Predicate::And(children) => join_clauses(children, " AND "),
        Predicate::Or(children) => join_clauses(children, " OR "),
    }
}

fn join_clauses(children: &[Predicate], separator: &str) -> Result<Option<String>, QueryError> {
    let mut clauses = Vec::with_capacity(children.len());
    for child in children {
        if let Some(clause) = predicate_to_sql(child)? {
            clauses.push(clause);
        }
    }

    Ok(match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(format!("({})", clauses.join(separator))),
    })
}

fn literal_to_sql(literal: &Literal) -> String {
    match literal {
        Literal::Null => "NULL".to_string(),
        Literal::Int(n) => n.to_string(),
        Literal::Text(s) => format!("'{}'", escape_string(s)),
        Literal::Time(ts) => format!("'{}'", format_timestamp(*ts)),
    }
}

/// Escape a string value for SQL (prevent injection)
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "''")
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Build the joined view-row scan
///
/// Column aliases are what [`SqlViewSource`](crate::source::SqlViewSource)
/// decodes by name.
pub fn view_scan_query(scan: &ViewScan<'_>) -> Result<String, QueryError> {
    let mut builder = QueryBuilder::new(format!("{} AS v", VIEWS_TABLE))
        .left_join(format!("{} AS b", ITEMS_TABLE), "b.id = v.blog_id")
        .left_join(format!("{} AS u", AUTHORS_TABLE), "u.id = b.author_id")
        .left_join(format!("{} AS c", COUNTRIES_TABLE), "c.id = u.country_id")
        .select_as("v.id", "view_id")
        .select_as("v.blog_id", "blog_id")
        .select_as("v.viewed_at", "viewed_at")
        .select_as("v.count", "count")
        .select_as("b.title", "title")
        .select_as("b.author_id", "author_id")
        .select_as("b.created_at", "created_at")
        .select_as("u.username", "username")
        .select_as("u.country_id", "country_id")
        .select_as("c.name", "country_name");

    if let Some(since) = scan.since {
        builder = builder.where_clause(format!("v.viewed_at >= '{}'", format_timestamp(since)));
    }
    if let Some(author_id) = scan.author_id {
        builder = builder.where_clause(format!("b.author_id = {}", author_id));
    }

    Ok(builder.apply_predicate(scan.predicate)?.order_by("v.id").build())
}

/// Build the content-item listing, optionally for one author
pub fn content_items_query(author_id: Option<u64>) -> String {
    let mut builder = QueryBuilder::new(ITEMS_TABLE)
        .select("id")
        .select("title")
        .select("author_id")
        .select("created_at");

    if let Some(author_id) = author_id {
        builder = builder.where_clause(format!("author_id = {}", author_id));
    }

    builder.order_by("id").build()
}
