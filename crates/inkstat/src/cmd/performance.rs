//! Performance command - period-over-period view growth
//!
//! # Usage
//!
//! ```bash
//! inkstat performance --period month
//! inkstat performance --period week --author 3 --format json
//! ```

use anyhow::Result;
use clap::Args;
use inkstat_analytics::Period;
use inkstat_config::Config;

use super::output::render;
use super::source::{QueryArgs, build_engine};

/// Performance command arguments
#[derive(Args, Debug)]
pub struct PerformanceArgs {
    /// Bucket width (day, week, month, year); unknown values mean day
    #[arg(short, long, default_value = "month")]
    pub period: String,

    /// Restrict to one author's content items
    #[arg(short, long)]
    pub author: Option<u64>,

    #[command(flatten)]
    pub query: QueryArgs,
}

/// Run the performance command
pub async fn run(args: PerformanceArgs, config: &Config) -> Result<()> {
    let period = Period::from_token(&args.period);
    let predicate = args.query.predicate()?;
    let format = args.query.output_format()?;

    let engine = build_engine(&config.query, &args.query)?;
    let rows = engine.performance(period, args.author, &predicate).await?;

    println!("{}", render(&rows, format)?);
    eprintln!("\n[{}]", engine.source_name());
    Ok(())
}
