//! Engine construction from the `[query]` config section
//!
//! ```toml
//! # In-memory store seeded from a JSON fixture (default backend)
//! [query]
//! data_file = "fixtures/blog.json"
//!
//! # Or views stored in ClickHouse
//! [query]
//! backend = "clickhouse"
//! url = "http://localhost:8123"
//! database = "blog"
//! username = "reader"
//! password = "secret"
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use inkstat_analytics::{
    AnalyticsEngine, Clock, FixedClock, Fixture, MemoryStore, Predicate, SqlViewSource,
    SystemClock, ViewSource, compile, parse_timestamp,
};
use inkstat_config::{QueryConfig as SourceConfig, SourceBackend};
use inkstat_query::{OutputFormat, QueryConfig, QueryEngine};
use serde_json::Value;

/// Arguments shared by the analytics commands
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Filter as JSON, e.g. '{"eq": {"author.username": "john"}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Evaluate as if the current time were this timestamp
    #[arg(long)]
    pub now: Option<String>,
}

impl QueryArgs {
    /// Parse the filter payload
    ///
    /// Invalid JSON is an error. Valid JSON that is not a recognizable
    /// filter compiles to match-all.
    pub fn filter_value(&self) -> Result<Option<Value>> {
        self.filter
            .as_deref()
            .map(|raw| serde_json::from_str(raw).context("filter is not valid JSON"))
            .transpose()
    }

    /// Compile the filter payload
    pub fn predicate(&self) -> Result<Predicate> {
        Ok(compile(self.filter_value()?.as_ref()))
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
    }

    fn clock(&self) -> Result<Arc<dyn Clock>> {
        Ok(match &self.now {
            Some(ts) => {
                let now = parse_timestamp(ts).with_context(|| format!("invalid --now: {}", ts))?;
                Arc::new(FixedClock::new(now))
            }
            None => Arc::new(SystemClock),
        })
    }
}

/// Build an analytics engine over the configured source
pub fn build_engine(config: &SourceConfig, args: &QueryArgs) -> Result<AnalyticsEngine> {
    let clock = args.clock()?;
    let source = build_source(config, clock.clone())?;
    tracing::debug!(source = source.name(), "data source ready");
    Ok(AnalyticsEngine::new(source).with_clock(clock))
}

fn build_source(config: &SourceConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn ViewSource>> {
    match config.backend {
        SourceBackend::Memory => {
            let store = match &config.data_file {
                Some(path) => {
                    let fixture = Fixture::from_file(path).with_context(|| {
                        format!("failed to load data file: {}", path.display())
                    })?;
                    tracing::info!(
                        path = %path.display(),
                        views = fixture.views.len(),
                        "loaded fixture"
                    );
                    MemoryStore::from_fixture(fixture, clock)
                }
                None => {
                    tracing::warn!("no [query] data_file configured, store is empty");
                    MemoryStore::with_clock(clock)
                }
            };
            Ok(Arc::new(store))
        }
        SourceBackend::Clickhouse => {
            let engine = QueryEngine::from_query_config(&backend_config(config)?)
                .context("failed to create query engine")?;
            Ok(Arc::new(SqlViewSource::from_backend(engine)))
        }
    }
}

/// Map the config section onto backend connection settings
fn backend_config(config: &SourceConfig) -> Result<QueryConfig> {
    let url = config
        .url
        .as_deref()
        .context("url required for clickhouse backend")?;

    let mut backend = QueryConfig::clickhouse(url, config.database());
    backend.max_execution_time = config.max_execution_time;
    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        backend = backend.with_credentials(user, pass);
    }
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use inkstat_analytics::{Author, ContentItem, Country, Period, ViewEvent};
    use std::io::Write;

    fn args(filter: Option<&str>, now: Option<&str>) -> QueryArgs {
        QueryArgs {
            filter: filter.map(String::from),
            format: "table".into(),
            now: now.map(String::from),
        }
    }

    #[test]
    fn test_filter_parsing() {
        assert!(args(None, None).filter_value().unwrap().is_none());
        assert!(args(Some("{not json"), None).filter_value().is_err());
        assert!(args(Some("[1, 2]"), None).predicate().unwrap().is_all());
        assert!(
            !args(Some(r#"{"eq": {"author.username": "john"}}"#), None)
                .predicate()
                .unwrap()
                .is_all()
        );
    }

    #[test]
    fn test_output_format() {
        let mut a = args(None, None);
        assert_eq!(a.output_format().unwrap(), OutputFormat::Table);
        a.format = "yaml".into();
        assert!(a.output_format().is_err());
    }

    #[test]
    fn test_backend_config_mapping() {
        let config: SourceConfig = SourceConfig {
            backend: SourceBackend::Clickhouse,
            url: Some("http://ch:8123".into()),
            database: Some("blog".into()),
            username: Some("reader".into()),
            password: Some("secret".into()),
            max_execution_time: 5,
            ..Default::default()
        };
        let backend = backend_config(&config).unwrap();
        assert_eq!(backend.url.as_deref(), Some("http://ch:8123"));
        assert_eq!(backend.database.as_deref(), Some("blog"));
        assert_eq!(backend.username.as_deref(), Some("reader"));
        assert_eq!(backend.max_execution_time, 5);

        let missing = SourceConfig {
            backend: SourceBackend::Clickhouse,
            ..Default::default()
        };
        assert!(backend_config(&missing).is_err());
    }

    #[test]
    fn test_bad_now_is_an_error() {
        let config = SourceConfig::default();
        assert!(build_engine(&config, &args(None, Some("next tuesday"))).is_err());
    }

    #[tokio::test]
    async fn test_memory_engine_from_fixture() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let fixture = Fixture {
            countries: vec![Country {
                id: 1,
                name: "Norway".into(),
            }],
            authors: vec![Author {
                id: 1,
                username: "john".into(),
                country_id: Some(1),
            }],
            content_items: vec![ContentItem {
                id: 10,
                title: "Hello".into(),
                author_id: Some(1),
                created_at: at,
            }],
            views: vec![ViewEvent {
                id: 1,
                content_item_id: 10,
                viewed_at: at,
                count: 4,
            }],
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&fixture).unwrap()).unwrap();

        let config = SourceConfig {
            data_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let engine = build_engine(&config, &args(None, Some("2024-03-15T12:00:00Z"))).unwrap();
        assert_eq!(engine.source_name(), "memory");

        let rows = engine
            .performance(Period::Month, None, &Predicate::All)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].view_total, 4);
    }

    #[test]
    fn test_missing_data_file() {
        let config = SourceConfig {
            data_file: Some("/nonexistent/blog.json".into()),
            ..Default::default()
        };
        assert!(build_engine(&config, &args(None, None)).is_err());
    }
}
