//! Read-through wrapping of fetch operations.
//!
//! A fetch returns `Result<Option<T>, E>`. Only `Ok(Some(_))` is cached:
//! absent results and errors pass through untouched so an origin outage is
//! never remembered as valid empty data. Hits are decoded back into `T`, so
//! callers see the same type whether or not the cache answered.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::keys::CacheArgs;
use super::store::CacheStore;

const METRIC_HIT_TOTAL: &str = "headway_cache_hit_total";
const METRIC_MISS_TOTAL: &str = "headway_cache_miss_total";
const METRIC_BYPASS_TOTAL: &str = "headway_cache_bypass_total";

#[derive(Debug, Clone)]
pub struct ReadThroughOptions {
    /// Readable key segment, also what invalidation patterns match on.
    pub key_prefix: &'static str,
    /// Name of the wrapped operation, hashed into the key.
    pub operation: &'static str,
    /// Falls back to the store's default TTL.
    pub ttl: Option<Duration>,
}

impl ReadThroughOptions {
    pub fn new(key_prefix: &'static str, operation: &'static str) -> Self {
        Self {
            key_prefix,
            operation,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ReadThrough {
    store: Arc<CacheStore>,
    key_prefix: &'static str,
    operation: &'static str,
    ttl: Duration,
}

impl ReadThrough {
    pub fn new(store: Arc<CacheStore>, options: ReadThroughOptions) -> Self {
        let ttl = options
            .ttl
            .unwrap_or_else(|| store.config().default_ttl());
        Self {
            store,
            key_prefix: options.key_prefix,
            operation: options.operation,
            ttl,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key a call with `args` reads and writes.
    pub fn key_for<A: CacheArgs>(&self, args: &A) -> String {
        args.call_args()
            .cache_key(self.store.namespace(), self.key_prefix, self.operation)
    }

    /// Run `op` behind the cache.
    pub async fn fetch<A, F, Fut, T, E>(&self, args: A, op: F) -> Result<Option<T>, E>
    where
        A: CacheArgs,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        T: Serialize + DeserializeOwned,
    {
        if !self.store.connect_check().await {
            counter!(METRIC_BYPASS_TOTAL, "operation" => self.operation).increment(1);
            debug!(
                cache = "read_through",
                outcome = "bypass",
                operation = self.operation,
                "Cache unavailable; calling through"
            );
            return op(args).await;
        }

        let key = self.key_for(&args);
        if let Some(cached) = self.store.get::<T>(&key).await {
            counter!(METRIC_HIT_TOTAL, "operation" => self.operation).increment(1);
            debug!(
                cache = "read_through",
                outcome = "hit",
                operation = self.operation,
                key = %key,
                "Cache hit"
            );
            return Ok(Some(cached));
        }

        counter!(METRIC_MISS_TOTAL, "operation" => self.operation).increment(1);
        debug!(
            cache = "read_through",
            outcome = "miss",
            operation = self.operation,
            key = %key,
            "Cache miss"
        );

        let result = op(args).await;
        if let Ok(Some(value)) = &result
            && !self.store.set(&key, value, self.ttl).await
        {
            debug!(
                operation = self.operation,
                key = %key,
                "Fetched value was not cached"
            );
        }
        result
    }

    /// Bind `op` to this cache configuration.
    pub fn wrap<F>(self, op: F) -> Wrapped<F> {
        Wrapped {
            read_through: self,
            op,
        }
    }
}

/// A fetch operation permanently wrapped by a [`ReadThrough`].
#[derive(Debug, Clone)]
pub struct Wrapped<F> {
    read_through: ReadThrough,
    op: F,
}

impl<F> Wrapped<F> {
    pub fn read_through(&self) -> &ReadThrough {
        &self.read_through
    }

    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<Option<T>, E>
    where
        A: CacheArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        T: Serialize + DeserializeOwned,
    {
        self.read_through.fetch(args, |args| (self.op)(args)).await
    }
}
