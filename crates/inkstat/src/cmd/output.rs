//! Rendering of result records as table, JSON or CSV
//!
//! JSON keeps the records' own `{x, y, z}` shape. Table and CSV spell the
//! columns out, including the bucket that JSON leaves implicit.

use anyhow::Result;
use inkstat_analytics::{BreakdownRow, PerformanceRow, RankRow};
use inkstat_query::OutputFormat;
use serde::Serialize;

/// A record that can be laid out in named columns
pub trait Tabular: Serialize {
    fn headers() -> &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

impl Tabular for BreakdownRow {
    fn headers() -> &'static [&'static str] {
        &["bucket", "key", "items", "views"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.bucket.format("%Y-%m-%d").to_string(),
            self.key.clone().unwrap_or_default(),
            self.item_count.to_string(),
            self.view_total.to_string(),
        ]
    }
}

impl Tabular for RankRow {
    fn headers() -> &'static [&'static str] {
        &["key", "secondary", "views"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            self.secondary.to_string(),
            self.view_total.to_string(),
        ]
    }
}

impl Tabular for PerformanceRow {
    fn headers() -> &'static [&'static str] {
        &["period", "views", "growth_pct"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.label.clone(),
            self.view_total.to_string(),
            format!("{:.2}", self.growth_pct),
        ]
    }
}

/// Render records in the requested format
pub fn render<T: Tabular>(rows: &[T], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(rows)?,
        OutputFormat::Csv => {
            let mut out = T::headers().join(",");
            for row in rows {
                out.push('\n');
                let cells: Vec<String> = row.cells().iter().map(|c| csv_escape(c)).collect();
                out.push_str(&cells.join(","));
            }
            out
        }
        OutputFormat::Table => render_table(rows),
    })
}

fn render_table<T: Tabular>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "(no data)".to_string();
    }

    let headers = T::headers();
    let cells: Vec<Vec<String>> = rows.iter().map(T::cells).collect();

    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count().min(40)); // Cap at 40 chars
            }
        }
    }
    let rule = "-".repeat(widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * 2);

    let mut lines = Vec::with_capacity(cells.len() + 4);
    lines.push(format_line(headers.iter().copied(), &widths));
    lines.push(rule.clone());
    for row in &cells {
        lines.push(format_line(row.iter().map(String::as_str), &widths));
    }
    lines.push(rule);
    lines.push(format!("{} rows", rows.len()));
    lines.join("\n")
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| {
            if cell.chars().count() > width {
                let cut: String = cell.chars().take(width.saturating_sub(3)).collect();
                format!("{}...", cut)
            } else {
                format!("{:width$}", cell, width = width)
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
