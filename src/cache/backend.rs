//! Raw key-value contract behind the cache store.

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// `ttl` reply for a key without expiry.
pub const TTL_PERSISTENT: i64 = -1;
/// `ttl` reply for a key that does not exist.
pub const TTL_MISSING: i64 = -2;

/// Server counters reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_commands_processed: u64,
    pub keyspace_hits: u64,
    pub keyspace_misses: u64,
}

impl StoreStats {
    /// Hit percentage rounded to two decimals; `0.0` when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.keyspace_hits as f64;
        let total = self.keyspace_hits.saturating_add(self.keyspace_misses).max(1) as f64;
        (hits / total * 100.0 * 100.0).round() / 100.0
    }
}

/// Operations a key-value store must offer to back a [`CacheStore`](super::CacheStore).
///
/// Implementations bound every call by their own timeouts and report failures
/// as [`CacheError`]; they never retry.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Returns the number of keys removed (0 or 1).
    async fn del(&self, key: &str) -> Result<u64, CacheError>;

    /// Every live key matching a Redis glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    async fn del_many(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Drop every key in the backend's keyspace.
    async fn flush(&self) -> Result<(), CacheError>;

    /// Remaining lifetime in seconds, or [`TTL_PERSISTENT`] / [`TTL_MISSING`].
    async fn ttl(&self, key: &str) -> Result<i64, CacheError>;

    async fn stats(&self) -> Result<StoreStats, CacheError>;

    /// Release connections. Later calls may fail.
    async fn close(&self) {}
}

/// Backend used when caching is switched off; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

impl UnavailableBackend {
    fn refuse<T>() -> Result<T, CacheError> {
        Err(CacheError::unavailable("caching is disabled"))
    }
}

#[async_trait]
impl KeyValueBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Self::refuse()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Self::refuse()
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Self::refuse()
    }

    async fn del(&self, _key: &str) -> Result<u64, CacheError> {
        Self::refuse()
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Self::refuse()
    }

    async fn del_many(&self, _keys: &[String]) -> Result<u64, CacheError> {
        Self::refuse()
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Self::refuse()
    }

    async fn ttl(&self, _key: &str) -> Result<i64, CacheError> {
        Self::refuse()
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        Self::refuse()
    }
}
