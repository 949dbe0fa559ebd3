//! Top command - rank content items, authors or countries by views
//!
//! # Usage
//!
//! ```bash
//! inkstat top content_item -n 5 --range last_7_days
//! inkstat top author --since 2024-01-01
//! inkstat top country --format json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use inkstat_analytics::{DEFAULT_TOP_N, RankDimension, parse_timestamp};
use inkstat_config::Config;

use super::output::render;
use super::source::{QueryArgs, build_engine};

/// Top command arguments
#[derive(Args, Debug)]
pub struct TopArgs {
    /// Entity to rank (content_item, author, country)
    pub dimension: String,

    /// Number of results
    #[arg(short, default_value_t = DEFAULT_TOP_N)]
    pub n: usize,

    /// Lookback token, e.g. last_7_days, last_month, last_year (default 30 days)
    #[arg(short, long, conflicts_with = "since")]
    pub range: Option<String>,

    /// Explicit cutoff timestamp instead of a range
    #[arg(long)]
    pub since: Option<String>,

    #[command(flatten)]
    pub query: QueryArgs,
}

/// Run the top command
pub async fn run(args: TopArgs, config: &Config) -> Result<()> {
    let dimension = RankDimension::parse(&args.dimension)?;
    let predicate = args.query.predicate()?;
    let format = args.query.output_format()?;

    let engine = build_engine(&config.query, &args.query)?;
    let rows = match &args.since {
        Some(since) => {
            let since =
                parse_timestamp(since).with_context(|| format!("invalid --since: {}", since))?;
            engine
                .top(dimension, args.n, &predicate, Some(since))
                .await?
        }
        None => {
            engine
                .top_in_range(dimension, args.n, &predicate, args.range.as_deref())
                .await?
        }
    };

    println!("{}", render(&rows, format)?);
    eprintln!("\n[{}]", engine.source_name());
    Ok(())
}
