use std::sync::Arc;
use std::time::Duration;

use headway::cache::{
    CacheConfig, CacheStore, KeyValueBackend, MemoryBackend, TTL_MISSING, UnavailableBackend,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Post {
    id: i64,
    title: String,
}

fn store_over(backend: Arc<MemoryBackend>) -> CacheStore {
    CacheStore::with_backend(CacheConfig::memory(), backend)
}

#[tokio::test]
async fn stored_values_round_trip_until_deleted() {
    let store = store_over(Arc::new(MemoryBackend::new()));
    let post = Post {
        id: 1,
        title: "Hello".to_string(),
    };

    assert!(store.set_default("graphql:post:1:abc", &post).await);
    assert_eq!(store.get::<Post>("graphql:post:1:abc").await, Some(post));

    assert!(store.delete("graphql:post:1:abc").await);
    assert!(!store.delete("graphql:post:1:abc").await);
    assert_eq!(store.get::<Post>("graphql:post:1:abc").await, None);
}

#[tokio::test]
async fn corrupt_payload_reads_as_a_miss() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_raw("graphql:post:1:abc", "{not json", Duration::from_secs(60));
    let store = store_over(Arc::clone(&backend));

    assert_eq!(store.get::<Post>("graphql:post:1:abc").await, None);
    assert_eq!(store.get_value("graphql:post:1:abc").await, None);
}

#[tokio::test(start_paused = true)]
async fn entries_expire_after_their_ttl() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store_over(Arc::clone(&backend));

    assert!(store.set("graphql:team_members:abc", &vec![1, 2, 3], Duration::from_secs(30)).await);
    let ttl = backend.ttl("graphql:team_members:abc").await.expect("ttl");
    assert!((1..=30).contains(&ttl), "unexpected ttl {ttl}");

    tokio::time::advance(Duration::from_secs(31)).await;

    assert_eq!(store.get::<Vec<i32>>("graphql:team_members:abc").await, None);
    assert_eq!(
        backend.ttl("graphql:team_members:abc").await.expect("ttl"),
        TTL_MISSING
    );
}

#[tokio::test(start_paused = true)]
async fn sub_second_ttl_is_raised_to_one_second() {
    let store = store_over(Arc::new(MemoryBackend::new()));

    assert!(store.set("graphql:k", &1, Duration::from_millis(10)).await);
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(store.get::<i32>("graphql:k").await, Some(1));
}

#[tokio::test]
async fn delete_pattern_removes_only_matching_keys() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store_over(Arc::clone(&backend));

    for key in [
        "graphql:articles:aaa",
        "graphql:articles:bbb",
        "graphql:article:7:ccc",
        "graphql:products:ddd",
    ] {
        assert!(store.set_default(key, &key).await);
    }

    assert_eq!(store.delete_pattern("graphql:*articles*").await, 2);
    assert_eq!(store.delete_pattern("graphql:*articles*").await, 0);
    assert_eq!(backend.len(), 2);
    assert!(store.get_value("graphql:article:7:ccc").await.is_some());
    assert!(store.get_value("graphql:products:ddd").await.is_some());
}

#[tokio::test]
async fn listing_is_truncated_but_reports_the_total() {
    let config = CacheConfig {
        key_listing_limit: 2,
        ..CacheConfig::memory()
    };
    let store = CacheStore::with_backend(config, Arc::new(MemoryBackend::new()));
    for id in 0..5 {
        assert!(store.set_default(&format!("graphql:product:{id}:x"), &id).await);
    }

    let listing = store.list_keys("graphql:*").await.expect("listing");
    assert_eq!(listing.total, 5);
    assert_eq!(listing.keys.len(), 2);
    assert!(listing.keys.iter().all(|key| key.ttl > 0));
}

#[tokio::test]
async fn clear_all_empties_the_keyspace() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store_over(Arc::clone(&backend));
    assert!(store.set_default("graphql:a", &1).await);
    assert!(store.set_default("other:b", &2).await);

    assert!(store.clear_all().await);
    assert!(backend.is_empty());
}

#[tokio::test]
async fn unavailable_backend_degrades_every_operation() {
    let store = CacheStore::with_backend(CacheConfig::memory(), Arc::new(UnavailableBackend));

    assert!(!store.connect_check().await);
    assert_eq!(store.get::<Post>("graphql:post:1").await, None);
    assert!(!store.set_default("graphql:post:1", &1).await);
    assert!(!store.delete("graphql:post:1").await);
    assert_eq!(store.delete_pattern("graphql:*").await, 0);
    assert!(!store.clear_all().await);
    assert!(store.list_keys("graphql:*").await.is_err());
    assert!(store.stats().await.is_err());
}

#[tokio::test]
async fn memory_stats_count_hits_and_misses() {
    let store = store_over(Arc::new(MemoryBackend::new()));
    assert!(store.set_default("graphql:a", &1).await);

    let _ = store.get::<i32>("graphql:a").await;
    let _ = store.get::<i32>("graphql:missing").await;

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.keyspace_hits, 1);
    assert_eq!(stats.keyspace_misses, 1);
    assert_eq!(stats.hit_rate(), 50.0);
}

#[tokio::test(start_paused = true)]
async fn short_lived_entries_do_not_accumulate() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store_over(Arc::clone(&backend));
    for id in 0..1000 {
        assert!(
            store
                .set(&format!("graphql:post:{id}:abc"), &id, Duration::from_secs(1))
                .await
        );
    }

    tokio::time::advance(Duration::from_secs(10)).await;
    for id in 0..10 {
        assert!(store.set_default(&format!("graphql:article:{id}:abc"), &id).await);
    }
    assert_eq!(backend.resident_len(), 10);
}

#[tokio::test]
async fn memory_capacity_bounds_the_store() {
    let config = CacheConfig {
        memory_max_entries: 3,
        ..CacheConfig::memory()
    };
    let backend = Arc::new(MemoryBackend::with_capacity(config.memory_max_entries_non_zero()));
    let store = CacheStore::with_backend(config, Arc::clone(&backend) as Arc<dyn KeyValueBackend>);
    for id in 0..50 {
        assert!(store.set_default(&format!("graphql:post:{id}:abc"), &id).await);
    }

    assert_eq!(backend.resident_len(), 3);
    assert_eq!(store.get::<i64>("graphql:post:49:abc").await, Some(49));
    assert_eq!(store.get::<i64>("graphql:post:0:abc").await, None);
}
