mod support;

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use headway::cache::{
    ById, CacheConfig, CacheStore, EntityKind, Invalidator, MemoryBackend, ReadThrough,
    ReadThroughOptions, UnavailableBackend,
};
use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use serial_test::serial;
use support::memory_store;

fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        snapshotter
    })
}

fn recorded_names() -> HashSet<String> {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect()
}

async fn lookup(read_through: &ReadThrough, id: i64) -> Option<i64> {
    read_through
        .fetch(ById(id), |ById(id)| async move { Ok::<_, ()>(Some(id)) })
        .await
        .expect("fetch")
}

#[tokio::test]
#[serial]
async fn read_through_emits_hit_and_miss_counters() {
    snapshotter();
    let read_through = ReadThrough::new(memory_store(), ReadThroughOptions::new("item", "item"));

    assert_eq!(lookup(&read_through, 1).await, Some(1));
    assert_eq!(lookup(&read_through, 1).await, Some(1));

    let names = recorded_names();
    for expected in ["headway_cache_miss_total", "headway_cache_hit_total"] {
        assert!(names.contains(expected), "missing metric {expected}: {names:?}");
    }
}

#[tokio::test]
#[serial]
async fn unavailable_store_emits_bypass_and_error_counters() {
    snapshotter();
    let store = Arc::new(CacheStore::with_backend(
        CacheConfig::memory(),
        Arc::new(UnavailableBackend),
    ));
    let read_through = ReadThrough::new(Arc::clone(&store), ReadThroughOptions::new("item", "item"));

    assert_eq!(lookup(&read_through, 2).await, Some(2));
    assert!(!store.set_default("graphql:item", &2).await);

    let names = recorded_names();
    for expected in ["headway_cache_bypass_total", "headway_cache_store_error_total"] {
        assert!(names.contains(expected), "missing metric {expected}: {names:?}");
    }
}

#[tokio::test]
#[serial]
async fn invalidation_counts_purged_keys() {
    snapshotter();
    let store = Arc::new(CacheStore::with_backend(
        CacheConfig::memory(),
        Arc::new(MemoryBackend::new()),
    ));
    assert!(store.set_default("graphql:articles:abc", &1).await);

    let purged = Invalidator::new(Arc::clone(&store))
        .entity_changed(EntityKind::Article, None)
        .await;
    assert_eq!(purged, 1);

    let names = recorded_names();
    assert!(
        names.contains("headway_cache_invalidated_keys_total"),
        "missing invalidation metric: {names:?}"
    );
}
