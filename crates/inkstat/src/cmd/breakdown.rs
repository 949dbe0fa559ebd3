//! Breakdown command - views per time bucket and dimension
//!
//! # Usage
//!
//! ```bash
//! inkstat breakdown author --period month
//! inkstat breakdown country --period week --format csv
//! inkstat breakdown author --filter '{"not": {"eq": {"country.name": "Norway"}}}'
//! ```

use anyhow::Result;
use clap::Args;
use inkstat_analytics::{BreakdownDimension, BreakdownWindow};
use inkstat_config::Config;

use super::output::render;
use super::source::{QueryArgs, build_engine};

/// Breakdown command arguments
#[derive(Args, Debug)]
pub struct BreakdownArgs {
    /// Dimension to group by (author, country)
    pub dimension: String,

    /// Bucket width (day, week, month, year); unknown values mean day
    /// buckets over the last 7 days
    #[arg(short, long, default_value = "month")]
    pub period: String,

    #[command(flatten)]
    pub query: QueryArgs,
}

/// Run the breakdown command
pub async fn run(args: BreakdownArgs, config: &Config) -> Result<()> {
    let dimension = BreakdownDimension::parse(&args.dimension)?;
    let window = BreakdownWindow::from_token(&args.period);
    let predicate = args.query.predicate()?;
    let format = args.query.output_format()?;

    let engine = build_engine(&config.query, &args.query)?;
    let rows = engine.breakdown_window(dimension, window, &predicate).await?;

    println!("{}", render(&rows, format)?);
    eprintln!("\n[{}]", engine.source_name());
    Ok(())
}
