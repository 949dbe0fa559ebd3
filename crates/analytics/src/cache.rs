//! Result cache contract
//!
//! The engine never caches. Callers that memoize results derive a key with
//! [`CacheKey::derive`], pick the operation's TTL from a [`CachePolicy`] and
//! go through [`get_or_compute`] against their own [`ResultCache`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// The cacheable operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Breakdown,
    Top,
    Performance,
}

impl Operation {
    /// Endpoint identity used in cache keys
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Breakdown => "breakdown",
            Self::Top => "top",
            Self::Performance => "performance",
        }
    }

    /// Default time to live
    pub fn default_ttl(&self) -> Duration {
        match self {
            Self::Breakdown => Duration::from_secs(5 * 60),
            Self::Top => Duration::from_secs(10 * 60),
            Self::Performance => Duration::from_secs(2 * 60),
        }
    }
}

/// Time to live per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub breakdown: Duration,
    pub top: Duration,
    pub performance: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            breakdown: Operation::Breakdown.default_ttl(),
            top: Operation::Top.default_ttl(),
            performance: Operation::Performance.default_ttl(),
        }
    }
}

impl CachePolicy {
    /// Build a policy from TTLs in seconds
    pub fn from_secs(breakdown: u64, top: u64, performance: u64) -> Self {
        Self {
            breakdown: Duration::from_secs(breakdown),
            top: Duration::from_secs(top),
            performance: Duration::from_secs(performance),
        }
    }

    pub fn ttl(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Breakdown => self.breakdown,
            Operation::Top => self.top,
            Operation::Performance => self.performance,
        }
    }
}

/// A fixed-length cache key: `analytics:<endpoint>:<sha256 hex>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for one request
    ///
    /// The digest covers the endpoint, the query parameters sorted by name
    /// and encoded as JSON pairs, and the filter payload serialized with
    /// object keys in sorted order. Parameter order and JSON key order never
    /// change the key. No filter digests the same as an empty object.
    pub fn derive(endpoint: &str, params: &[(&str, &str)], filter: Option<&Value>) -> Self {
        let mut sorted: Vec<(&str, &str)> = params.to_vec();
        sorted.sort();
        // JSON pairs keep `&` and `=` inside values from aliasing other params
        let pairs: Vec<Value> = sorted
            .iter()
            .map(|&(name, value)| Value::from(vec![name, value]))
            .collect();
        let mut query = String::new();
        write_canonical(&Value::Array(pairs), &mut query);

        let mut body = String::new();
        match filter {
            Some(value) => write_canonical(value, &mut body),
            None => body.push_str("{}"),
        }

        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update(b"|");
        hasher.update(query.as_bytes());
        hasher.update(b"|");
        hasher.update(body.as_bytes());

        Self(format!(
            "analytics:{}:{}",
            endpoint,
            hex::encode(hasher.finalize())
        ))
    }

    /// Derive the key for an operation
    pub fn for_operation(
        operation: Operation,
        params: &[(&str, &str)],
        filter: Option<&Value>,
    ) -> Self {
        Self::derive(operation.endpoint(), params, filter)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compact JSON with object keys sorted at every level
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, child)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(child, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, child) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(child, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Key/value storage for computed results, owned by the caller
#[async_trait]
pub trait ResultCache<V: Send + 'static>: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<V>;

    async fn set(&self, key: &CacheKey, value: V, ttl: Duration);
}

/// Return the cached value or compute, store and return it
///
/// Only successful results are stored; errors pass through uncached.
pub async fn get_or_compute<V, C, F, Fut, E>(
    cache: &C,
    key: &CacheKey,
    ttl: Duration,
    compute: F,
) -> Result<V, E>
where
    V: Clone + Send + 'static,
    C: ResultCache<V> + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(hit) = cache.get(key).await {
        tracing::debug!(key = %key, "cache hit");
        return Ok(hit);
    }

    let value = compute().await?;
    cache.set(key, value.clone(), ttl).await;
    tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache fill");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<CacheKey, (Vec<u64>, Duration)>>,
    }

    #[async_trait]
    impl ResultCache<Vec<u64>> for MapCache {
        async fn get(&self, key: &CacheKey) -> Option<Vec<u64>> {
            self.entries.lock().get(key).map(|(v, _)| v.clone())
        }

        async fn set(&self, key: &CacheKey, value: Vec<u64>, ttl: Duration) {
            self.entries.lock().insert(key.clone(), (value, ttl));
        }
    }

    #[test]
    fn test_default_ttls() {
        let policy = CachePolicy::default();
        assert_eq!(policy.ttl(Operation::Breakdown), Duration::from_secs(300));
        assert_eq!(policy.ttl(Operation::Top), Duration::from_secs(600));
        assert_eq!(policy.ttl(Operation::Performance), Duration::from_secs(120));
        assert_eq!(CachePolicy::from_secs(1, 2, 3).ttl(Operation::Top), Duration::from_secs(2));
    }

    #[test]
    fn test_key_shape() {
        let key = CacheKey::derive("top", &[], None);
        let (prefix, digest) = key.as_str().rsplit_once(':').unwrap();
        assert_eq!(prefix, "analytics:top");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_ignores_param_and_json_key_order() {
        let a = CacheKey::derive(
            "breakdown",
            &[("period", "month"), ("dimension", "country")],
            Some(&json!({"and": [{"eq": {"a": 1, "b": 2}}]})),
        );
        let b = CacheKey::derive(
            "breakdown",
            &[("dimension", "country"), ("period", "month")],
            Some(&json!({"and": [{"eq": {"b": 2, "a": 1}}]})),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_inputs() {
        let base = CacheKey::derive("top", &[("n", "10")], None);
        assert_ne!(base, CacheKey::derive("top", &[("n", "5")], None));
        assert_ne!(base, CacheKey::derive("breakdown", &[("n", "10")], None));
        assert_ne!(
            base,
            CacheKey::derive("top", &[("n", "10")], Some(&json!({"eq": {"id": 1}})))
        );
        assert_eq!(
            base,
            CacheKey::derive("top", &[("n", "10")], Some(&json!({})))
        );
        // Array order is meaningful
        assert_ne!(
            CacheKey::derive("top", &[], Some(&json!({"or": [1, 2]}))),
            CacheKey::derive("top", &[], Some(&json!({"or": [2, 1]})))
        );
    }

    #[test]
    fn test_key_params_are_unambiguous() {
        assert_ne!(
            CacheKey::derive("top", &[("n", "5&range=last_7_days")], None),
            CacheKey::derive("top", &[("n", "5"), ("range", "last_7_days")], None)
        );
        assert_ne!(
            CacheKey::derive("top", &[("n", "5=")], None),
            CacheKey::derive("top", &[("n=", "5")], None)
        );
        assert_eq!(
            CacheKey::derive("top", &[("range", "last_7_days"), ("n", "5")], None),
            CacheKey::derive("top", &[("n", "5"), ("range", "last_7_days")], None)
        );
    }

    #[test]
    fn test_canonical_json() {
        let mut out = String::new();
        write_canonical(&json!({"b": [1, {"d": null, "c": "x"}], "a": true}), &mut out);
        assert_eq!(out, r#"{"a":true,"b":[1,{"c":"x","d":null}]}"#);
    }

    #[tokio::test]
    async fn test_get_or_compute() {
        let cache = MapCache::default();
        let key = CacheKey::for_operation(Operation::Top, &[], None);
        let ttl = Operation::Top.default_ttl();

        let first: Result<Vec<u64>, String> =
            get_or_compute(&cache, &key, ttl, || async { Ok(vec![1, 2]) }).await;
        assert_eq!(first.unwrap(), vec![1, 2]);
        assert_eq!(cache.entries.lock().get(&key).unwrap().1, ttl);

        let second: Result<Vec<u64>, String> =
            get_or_compute(&cache, &key, ttl, || async { Ok(vec![9]) }).await;
        assert_eq!(second.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = MapCache::default();
        let key = CacheKey::for_operation(Operation::Breakdown, &[], None);
        let ttl = Operation::Breakdown.default_ttl();

        let failed: Result<Vec<u64>, String> =
            get_or_compute(&cache, &key, ttl, || async { Err("boom".to_string()) }).await;
        assert!(failed.is_err());
        assert!(cache.entries.lock().is_empty());
    }
}
