//! Cache-key command - show where a result would be memoized
//!
//! # Usage
//!
//! ```bash
//! inkstat cache-key top --param range=last_7_days --param n=5
//! inkstat cache-key breakdown --param period=month --filter '{"eq": {"author.username": "john"}}'
//! ```

use anyhow::{Context, Result};
use clap::Args;
use inkstat_analytics::{CacheKey, CachePolicy, Operation};
use inkstat_config::{CacheConfig, Config};
use serde_json::Value;

/// Cache-key command arguments
#[derive(Args, Debug)]
pub struct CacheKeyArgs {
    /// Operation (breakdown, top, performance)
    pub operation: String,

    /// Query parameter as name=value; repeatable
    #[arg(long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Filter payload as JSON
    #[arg(long)]
    pub filter: Option<String>,
}

/// Run the cache-key command
pub fn run(args: CacheKeyArgs, config: &Config) -> Result<()> {
    let operation = parse_operation(&args.operation)?;
    let params = split_params(&args.params)?;
    let filter: Option<Value> = args
        .filter
        .as_deref()
        .map(|raw| serde_json::from_str(raw).context("filter is not valid JSON"))
        .transpose()?;

    let key = CacheKey::for_operation(operation, &params, filter.as_ref());
    let ttl = policy(&config.cache).ttl(operation);

    println!("{}", key);
    println!("ttl: {}s", ttl.as_secs());
    Ok(())
}

fn parse_operation(s: &str) -> Result<Operation> {
    match s.to_lowercase().as_str() {
        "breakdown" => Ok(Operation::Breakdown),
        "top" => Ok(Operation::Top),
        "performance" => Ok(Operation::Performance),
        _ => Err(anyhow::anyhow!(
            "unknown operation: {}. Use one of: breakdown, top, performance",
            s
        )),
    }
}

fn split_params(raw: &[String]) -> Result<Vec<(&str, &str)>> {
    raw.iter()
        .map(|p| {
            p.split_once('=')
                .ok_or_else(|| anyhow::anyhow!("expected NAME=VALUE, got '{}'", p))
        })
        .collect()
}

fn policy(cache: &CacheConfig) -> CachePolicy {
    CachePolicy::from_secs(
        cache.breakdown_ttl_secs,
        cache.top_ttl_secs,
        cache.performance_ttl_secs,
    )
}
