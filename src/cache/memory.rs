//! In-process backend with per-key expiry.
//!
//! Entries live in an LRU bounded by `memory_max_entries`. An expired entry is
//! dropped when a command touches it; writes also sweep every expired entry
//! once the earliest expiry has passed, at most once per [`SWEEP_INTERVAL`]
//! unless the cache is full. Uses tokio's clock so tests can pause and
//! advance time.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;
use tracing::debug;

use super::backend::{KeyValueBackend, StoreStats, TTL_MISSING};
use super::error::CacheError;
use super::glob::glob_match;
use super::lock::mutex_lock;

const LOCK_TARGET: &str = "cache::memory";
const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug)]
struct MemoryState {
    entries: LruCache<String, MemoryEntry>,
    /// Lower bound on the earliest expiry among stored entries.
    next_expiry: Option<Instant>,
    last_sweep: Instant,
}

impl MemoryState {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            next_expiry: None,
            last_sweep: Instant::now(),
        }
    }

    fn insert(&mut self, key: &str, value: &str, expires_at: Instant) {
        let now = Instant::now();
        let full = self.entries.len() >= self.entries.cap().get() && !self.entries.contains(key);
        let due = self.next_expiry.is_some_and(|expiry| expiry <= now);
        if due && (full || now.duration_since(self.last_sweep) >= SWEEP_INTERVAL) {
            self.sweep(now);
        }

        self.next_expiry = Some(match self.next_expiry {
            Some(expiry) => expiry.min(expires_at),
            None => expires_at,
        });
        self.entries.put(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    fn sweep(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        self.next_expiry = self.entries.iter().map(|(_, entry)| entry.expires_at).min();
        self.last_sweep = now;

        if !expired.is_empty() {
            debug!(
                target = "headway::cache::memory",
                removed = expired.len(),
                remaining = self.entries.len(),
                "Expired entries swept"
            );
        }
        expired.len()
    }
}

#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    commands: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend holding at most `capacity` entries; the least recently used is evicted first.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(MemoryState::new(capacity)),
            commands: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store a raw payload verbatim, bypassing serialization.
    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "insert_raw");
        state.insert(key, value, Instant::now() + ttl);
    }

    /// Live entries, expired ones excluded.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let state = mutex_lock(&self.state, LOCK_TARGET, "len");
        state.entries.iter().filter(|(_, entry)| entry.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries held in memory, including expired ones not yet dropped.
    pub fn resident_len(&self) -> usize {
        mutex_lock(&self.state, LOCK_TARGET, "resident_len").entries.len()
    }

    fn command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.command();
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.command();
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "get");
        let value = state
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());
        if value.is_none() {
            state.entries.pop(key);
        }
        drop(state);

        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.command();
        if ttl.is_zero() {
            return Err(CacheError::backend("invalid expire time in 'setex' command"));
        }
        self.insert_raw(key, value, ttl);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<u64, CacheError> {
        self.command();
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "del");
        Ok(match state.entries.pop(key) {
            Some(entry) if entry.is_live(now) => 1,
            _ => 0,
        })
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.command();
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "keys");
        state.sweep(now);
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn del_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.command();
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "del_many");
        let removed = keys
            .iter()
            .filter_map(|key| state.entries.pop(key))
            .filter(|entry| entry.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.command();
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "flush");
        state.entries.clear();
        state.next_expiry = None;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        self.command();
        let now = Instant::now();
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "ttl");
        let expires_at = state
            .entries
            .peek(key)
            .map(|entry| entry.expires_at)
            .filter(|expires_at| *expires_at > now);
        let Some(expires_at) = expires_at else {
            state.entries.pop(key);
            return Ok(TTL_MISSING);
        };
        // Same rounding as Redis: nearest whole second.
        let seconds = (expires_at.duration_since(now).as_millis() + 500) / 1000;
        Ok(i64::try_from(seconds).unwrap_or(i64::MAX))
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        self.command();
        Ok(StoreStats {
            total_commands_processed: self.commands.load(Ordering::Relaxed),
            keyspace_hits: self.hits.load(Ordering::Relaxed),
            keyspace_misses: self.misses.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "v", Duration::from_secs(1))
            .await
            .expect("set");
        assert_eq!(backend.get("k").await.expect("get"), Some("v".to_string()));

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(backend.get("k").await.expect("get"), None);
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_reports_remaining_and_missing() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "v", Duration::from_secs(300))
            .await
            .expect("set");
        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(backend.ttl("k").await.expect("ttl"), 200);
        assert_eq!(backend.ttl("absent").await.expect("ttl"), TTL_MISSING);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_entries() {
        let backend = MemoryBackend::new();
        for index in 0..500 {
            backend
                .set_ex(&format!("old:{index}"), "v", Duration::from_secs(1))
                .await
                .expect("set");
        }
        assert_eq!(backend.resident_len(), 500);

        tokio::time::advance(Duration::from_secs(10)).await;
        for index in 0..10 {
            backend
                .set_ex(&format!("new:{index}"), "v", Duration::from_secs(60))
                .await
                .expect("set");
        }
        assert_eq!(backend.resident_len(), 10);
        assert_eq!(backend.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_are_rate_limited() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("a", "v", Duration::from_millis(1100))
            .await
            .expect("set");
        backend
            .set_ex("b", "v", Duration::from_millis(1200))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_millis(1150)).await;
        backend.set_ex("c", "v", Duration::from_secs(60)).await.expect("set");
        assert_eq!(backend.resident_len(), 2);

        tokio::time::advance(Duration::from_millis(100)).await;
        backend.set_ex("d", "v", Duration::from_secs(60)).await.expect("set");
        assert_eq!(backend.resident_len(), 3);

        tokio::time::advance(Duration::from_secs(1)).await;
        backend.set_ex("e", "v", Duration::from_secs(60)).await.expect("set");
        assert_eq!(backend.resident_len(), 3);
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted_at_capacity() {
        let backend = MemoryBackend::with_capacity(NonZeroUsize::new(2).expect("capacity"));
        let ttl = Duration::from_secs(60);
        backend.set_ex("a", "1", ttl).await.expect("set");
        backend.set_ex("b", "2", ttl).await.expect("set");
        assert_eq!(backend.get("a").await.expect("get"), Some("1".to_string()));

        backend.set_ex("c", "3", ttl).await.expect("set");
        assert_eq!(backend.resident_len(), 2);
        assert_eq!(backend.get("b").await.expect("get"), None);
        assert_eq!(backend.get("a").await.expect("get"), Some("1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_go_before_live_ones_at_capacity() {
        let backend = MemoryBackend::with_capacity(NonZeroUsize::new(2).expect("capacity"));
        backend.set_ex("short", "1", Duration::from_secs(1)).await.expect("set");
        backend.set_ex("long", "2", Duration::from_secs(60)).await.expect("set");
        let _ = backend.get("short").await;

        tokio::time::advance(Duration::from_secs(2)).await;
        backend.set_ex("next", "3", Duration::from_secs(60)).await.expect("set");
        assert_eq!(backend.get("long").await.expect("get"), Some("2".to_string()));
        assert_eq!(backend.get("next").await.expect("get"), Some("3".to_string()));
    }

    #[tokio::test]
    async fn zero_ttl_is_rejected() {
        let backend = MemoryBackend::new();
        assert!(backend.set_ex("k", "v", Duration::ZERO).await.is_err());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn keys_filters_by_pattern_and_sorts() {
        let backend = MemoryBackend::new();
        let ttl = Duration::from_secs(60);
        for key in ["graphql:b", "graphql:a", "other:a"] {
            backend.set_ex(key, "1", ttl).await.expect("set");
        }
        let keys = backend.keys("graphql:*").await.expect("keys");
        assert_eq!(keys, vec!["graphql:a".to_string(), "graphql:b".to_string()]);
    }

    #[tokio::test]
    async fn del_reports_removed_count() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(backend.del("k").await.expect("del"), 1);
        assert_eq!(backend.del("k").await.expect("del"), 0);
    }

    #[tokio::test]
    async fn stats_count_hits_and_misses() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .expect("set");
        let _ = backend.get("k").await;
        let _ = backend.get("k").await;
        let _ = backend.get("missing").await;

        let stats = backend.stats().await.expect("stats");
        assert_eq!(stats.keyspace_hits, 2);
        assert_eq!(stats.keyspace_misses, 1);
        assert_eq!(stats.total_commands_processed, 5);
    }
}
