//! Cache backend selection.

use std::sync::Arc;

use tracing::info;

use crate::cache::{
    BackendKind, CacheConfig, CacheError, CacheStore, KeyValueBackend, MemoryBackend,
    UnavailableBackend,
};

use super::redis::RedisBackend;

/// Build the store described by `config`.
///
/// Does not require the backend to be reachable; Redis connects lazily and an
/// unreachable server only makes `connect_check` report false.
pub fn build_store(config: &CacheConfig) -> Result<CacheStore, CacheError> {
    let backend: Arc<dyn KeyValueBackend> = if !config.enabled {
        Arc::new(UnavailableBackend)
    } else {
        match config.backend {
            BackendKind::Redis => Arc::new(RedisBackend::new(config)?),
            BackendKind::Memory => Arc::new(MemoryBackend::with_capacity(
                config.memory_max_entries_non_zero(),
            )),
        }
    };

    info!(
        target = "headway::infra::cache",
        backend = backend.name(),
        namespace = %config.namespace,
        default_ttl_seconds = config.default_ttl().as_secs(),
        "Cache store configured"
    );

    Ok(CacheStore::with_backend(config.clone(), backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_follows_configuration() {
        let memory = build_store(&CacheConfig::memory()).expect("memory store");
        assert_eq!(memory.backend_name(), "memory");

        let redis = build_store(&CacheConfig::default()).expect("redis store");
        assert_eq!(redis.backend_name(), "redis");
    }

    #[tokio::test]
    async fn disabled_store_degrades_to_noops() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::memory()
        };
        let store = build_store(&config).expect("store");
        assert!(!store.connect_check().await);
        assert!(!store.set_default("k", &1).await);
        assert_eq!(store.get_value("k").await, None);
        assert!(!store.delete("k").await);
        assert_eq!(store.delete_pattern("*").await, 0);
        assert!(!store.clear_all().await);
        assert!(store.stats().await.is_err());
    }
}
