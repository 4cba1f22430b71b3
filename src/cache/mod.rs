//! Headway cache layer.
//!
//! Query resolvers run behind [`ReadThrough`] wrappers that key each call by a
//! [`fingerprint`] and consult the shared [`CacheStore`]; mutations purge
//! stale entries through the [`Invalidator`].
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "redis"        # or "memory"
//! redis_host = "localhost"
//! namespace = "graphql"
//! default_ttl_seconds = 300
//! ```
//!
//! The store is failure-contained: an unreachable backend turns every lookup
//! into a pass-through and every write into a no-op.

mod backend;
mod config;
mod error;
mod glob;
mod invalidation;
mod keys;
mod lock;
mod memory;
mod read_through;
mod store;

pub use backend::{KeyValueBackend, StoreStats, TTL_MISSING, TTL_PERSISTENT, UnavailableBackend};
pub use config::{BackendKind, CacheConfig, RedisEndpoint};
pub use error::CacheError;
pub use glob::glob_match;
pub use invalidation::{EntityKind, Invalidator, invalidate_for};
pub use keys::{ById, CacheArgs, CallArgs, fingerprint};
pub use memory::MemoryBackend;
pub use read_through::{ReadThrough, ReadThroughOptions, Wrapped};
pub use store::{CacheStore, KeyInfo, KeyListing};
