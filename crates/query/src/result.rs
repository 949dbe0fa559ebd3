//! Rows returned by a SQL backend

use serde_json::Value;

/// Rows of one statement, with cells addressed by column name
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column names in row order
    pub columns: Vec<String>,

    pub rows: Vec<Vec<Value>>,

    pub row_count: usize,

    /// Wall time of the round trip in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>, execution_time_ms: u64) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
            execution_time_ms,
        }
    }

    /// A result with no columns and no rows
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    ///
    /// `JSONEachRow` output does not promise column order, so readers look
    /// columns up by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_index_by_name() {
        let result = QueryResult::new(
            vec!["count".into(), "viewed_at".into()],
            vec![vec![json!(3), json!("2024-01-01 00:00:00")]],
            0,
        );

        assert_eq!(result.column_index("viewed_at"), Some(1));
        assert_eq!(result.column_index("missing"), None);
        assert_eq!(result.row_count, 1);
    }

    #[test]
    fn test_empty_result() {
        let result = QueryResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.row_count, 0);
        assert!(result.columns.is_empty());
    }
}
