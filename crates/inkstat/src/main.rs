//! inkstat - Page-view analytics for authored content
//!
//! # Usage
//!
//! ```bash
//! # Monthly views per author
//! inkstat breakdown author --period month
//! inkstat --config configs/inkstat.toml breakdown country --period week
//!
//! # Top 5 items over the last week, Norwegian authors only
//! inkstat top content_item -n 5 --range last_7_days \
//!     --filter '{"eq": {"author.country.name": "Norway"}}'
//!
//! # Month-over-month growth for one author
//! inkstat performance --period month --author 3 --format json
//!
//! # Cache key a caller would store the result under
//! inkstat cache-key top --param range=last_7_days --param n=5
//! ```

mod cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inkstat_config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// inkstat - Page-view analytics for authored content
#[derive(Parser, Debug)]
#[command(name = "inkstat")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Views per time bucket and author or country
    Breakdown(cmd::breakdown::BreakdownArgs),

    /// Top content items, authors or countries by views
    Top(cmd::top::TopArgs),

    /// Views per bucket with growth against the previous bucket
    Performance(cmd::performance::PerformanceArgs),

    /// Print the cache key and TTL for a request
    CacheKey(cmd::cache_key::CacheKeyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level, config.log.format)?;

    match cli.command {
        Command::Breakdown(args) => cmd::breakdown::run(args, &config).await,
        Command::Top(args) => cmd::top::run(args, &config).await,
        Command::Performance(args) => cmd::performance::run(args, &config).await,
        Command::CacheKey(args) => cmd::cache_key::run(args, &config),
    }
}

/// Load the config file, or defaults when none is given
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}
