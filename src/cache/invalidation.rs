//! Write-side invalidation.
//!
//! A committed write to an entity purges every cached collection of that
//! entity type and, when the id is known, every cached single-entity lookup
//! for that id.

use std::fmt;
use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use super::store::CacheStore;

const METRIC_INVALIDATED_KEYS_TOTAL: &str = "headway_cache_invalidated_keys_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Article,
    Product,
    TeamMember,
    WordPressPost,
}

impl EntityKind {
    /// Key segment of single-entity lookups; collections use the plural `{name}s`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Article => "article",
            EntityKind::Product => "product",
            EntityKind::TeamMember => "team_member",
            EntityKind::WordPressPost => "wp_post",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patterns to purge after a write to `entity` (and `id`, when known).
pub fn invalidate_for(namespace: &str, entity: EntityKind, id: Option<i64>) -> Vec<String> {
    let name = entity.as_str();
    let mut patterns = vec![format!("{namespace}:*{name}s*")];
    if let Some(id) = id {
        patterns.push(format!("{namespace}:*{name}:{id}:*"));
    }
    patterns
}

/// Applies [`invalidate_for`] against a store.
#[derive(Debug, Clone)]
pub struct Invalidator {
    store: Arc<CacheStore>,
}

impl Invalidator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Purge entries made stale by a write. Returns the number of keys removed.
    ///
    /// Runs on its own task so a cancelled request does not abandon the purge
    /// half way. Never fails; store errors count as zero deletions.
    pub async fn entity_changed(&self, entity: EntityKind, id: Option<i64>) -> u64 {
        let store = Arc::clone(&self.store);
        let patterns = invalidate_for(store.namespace(), entity, id);

        let task = tokio::spawn(async move {
            let mut total = 0_u64;
            for pattern in patterns {
                let deleted = store.delete_pattern(&pattern).await;
                info!(
                    cache = "invalidation",
                    entity = %entity,
                    pattern = %pattern,
                    deleted,
                    "Cache pattern invalidated"
                );
                total += deleted;
            }
            total
        });

        match task.await {
            Ok(total) => {
                counter!(METRIC_INVALIDATED_KEYS_TOTAL).increment(total);
                total
            }
            Err(err) => {
                warn!(entity = %entity, error = %err, "Cache invalidation task failed");
                0
            }
        }
    }
}
