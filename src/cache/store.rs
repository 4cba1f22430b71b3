//! Failure-contained cache store.
//!
//! Wraps a [`KeyValueBackend`] and converts every backend failure into a miss,
//! a `false`, or a zero count. Callers on the request path never see a cache
//! error.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::backend::{KeyValueBackend, StoreStats};
use super::config::CacheConfig;
use super::error::CacheError;

const METRIC_STORE_ERROR_TOTAL: &str = "headway_cache_store_error_total";

/// One live key with its remaining lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub key: String,
    pub ttl: i64,
}

/// Result of a pattern listing, truncated to the configured page size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyListing {
    pub total: usize,
    pub keys: Vec<KeyInfo>,
}

pub struct CacheStore {
    backend: Arc<dyn KeyValueBackend>,
    config: CacheConfig,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend.name())
            .field("namespace", &self.config.namespace)
            .finish()
    }
}

impl CacheStore {
    pub fn with_backend(config: CacheConfig, backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Liveness probe. Any failure, including a timeout, reports `false`.
    pub async fn connect_check(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(err) => {
                debug!(backend = self.backend.name(), error = %err, "Cache store unavailable");
                false
            }
        }
    }

    /// Cached value decoded as `T`; absent when missing, unreadable or undecodable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                self.record_failure("get", &err);
                return None;
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                self.record_failure("decode", &CacheError::Deserialization(err));
                None
            }
        }
    }

    /// Cached value as a plain JSON tree.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        self.get::<Value>(key).await
    }

    /// Store `value` for `ttl` (at least one second). Returns whether it was written.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                self.record_failure("encode", &CacheError::Serialization(err));
                return false;
            }
        };

        let ttl = ttl.max(Duration::from_secs(1));
        match self.backend.set_ex(key, &payload, ttl).await {
            Ok(()) => true,
            Err(err) => {
                self.record_failure("set", &err);
                false
            }
        }
    }

    /// Store with the configured default TTL.
    pub async fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        self.set(key, value, self.config.default_ttl()).await
    }

    /// True iff a key was removed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.del(key).await {
            Ok(removed) => removed > 0,
            Err(err) => {
                self.record_failure("delete", &err);
                false
            }
        }
    }

    /// Delete every key matching `pattern`; returns how many were removed.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        let keys = match self.backend.keys(pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                self.record_failure("delete_pattern", &err);
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }

        match self.backend.del_many(&keys).await {
            Ok(removed) => removed,
            Err(err) => {
                self.record_failure("delete_pattern", &err);
                0
            }
        }
    }

    /// Empty the backend's keyspace.
    pub async fn clear_all(&self) -> bool {
        match self.backend.flush().await {
            Ok(()) => {
                info!(backend = self.backend.name(), "Cache cleared");
                true
            }
            Err(err) => {
                self.record_failure("clear_all", &err);
                false
            }
        }
    }

    /// Keys matching `pattern` with their TTLs, at most `key_listing_limit` of them.
    pub async fn list_keys(&self, pattern: &str) -> Result<KeyListing, CacheError> {
        let keys = self.backend.keys(pattern).await?;
        let total = keys.len();
        let mut listed = Vec::with_capacity(total.min(self.config.key_listing_limit()));
        for key in keys.into_iter().take(self.config.key_listing_limit()) {
            let ttl = self.backend.ttl(&key).await?;
            listed.push(KeyInfo { key, ttl });
        }
        Ok(KeyListing {
            total,
            keys: listed,
        })
    }

    pub async fn stats(&self) -> Result<StoreStats, CacheError> {
        self.backend.stats().await
    }

    pub async fn close(&self) {
        self.backend.close().await;
        debug!(backend = self.backend.name(), "Cache store closed");
    }

    fn record_failure(&self, op: &'static str, err: &CacheError) {
        counter!(METRIC_STORE_ERROR_TOTAL, "op" => op).increment(1);
        warn!(
            op,
            backend = self.backend.name(),
            error = %err,
            "Cache store operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::cache::MemoryBackend;

    fn memory_store() -> (Arc<MemoryBackend>, CacheStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CacheStore::with_backend(CacheConfig::memory(), backend.clone());
        (backend, store)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: i64,
        title: String,
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (_, store) = memory_store();
        let sample = Sample {
            id: 1,
            title: "A".to_string(),
        };
        assert!(store.set_default("graphql:k", &sample).await);
        assert_eq!(store.get::<Sample>("graphql:k").await, Some(sample));
    }

    #[tokio::test]
    async fn corrupt_entry_reads_as_absent() {
        let (backend, store) = memory_store();
        backend.insert_raw("graphql:bad", "{not json", Duration::from_secs(60));
        assert_eq!(store.get_value("graphql:bad").await, None);
    }

    #[tokio::test]
    async fn mismatched_shape_reads_as_absent() {
        let (_, store) = memory_store();
        assert!(store.set_default("graphql:k", &vec![1, 2, 3]).await);
        assert_eq!(store.get::<Sample>("graphql:k").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_still_expires() {
        let (backend, store) = memory_store();
        assert!(store.set("graphql:k", &1, Duration::ZERO).await);
        let ttl = backend.ttl("graphql:k").await.expect("ttl");
        assert_eq!(ttl, 1);
    }

    #[tokio::test]
    async fn list_keys_caps_at_limit() {
        let backend = Arc::new(MemoryBackend::new());
        let config = CacheConfig {
            key_listing_limit: 2,
            ..CacheConfig::memory()
        };
        let store = CacheStore::with_backend(config, backend);
        for index in 0..5 {
            store.set_default(&format!("graphql:{index}"), &index).await;
        }

        let listing = store.list_keys("graphql:*").await.expect("listing");
        assert_eq!(listing.total, 5);
        assert_eq!(listing.keys.len(), 2);
        assert_eq!(listing.keys[0].key, "graphql:0");
        assert_eq!(listing.keys[0].ttl, 300);
    }
}
