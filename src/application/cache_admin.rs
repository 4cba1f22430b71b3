//! Operator-facing cache administration.

use std::sync::Arc;

use tracing::info;

use crate::application::content::{ArticleListQuery, ContentError, ContentQueries, ProductListQuery};
use crate::application::wordpress::{PostListQuery, WordPressQueries};
use crate::cache::{CacheError, CacheStore, KeyListing, StoreStats};
use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    Connected(StoreStats),
    /// Reachable, but the counters could not be read.
    StatsUnavailable(String),
    Disconnected,
}

/// Entry counts produced by a warm-up run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupReport {
    pub wordpress_posts: usize,
    pub articles: usize,
    pub products: usize,
    pub team_members: usize,
}

pub struct CacheAdmin {
    store: Arc<CacheStore>,
    content: Arc<ContentQueries>,
    wordpress: Arc<WordPressQueries>,
}

impl CacheAdmin {
    pub fn new(
        store: Arc<CacheStore>,
        content: Arc<ContentQueries>,
        wordpress: Arc<WordPressQueries>,
    ) -> Self {
        Self {
            store,
            content,
            wordpress,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn status(&self) -> CacheStatus {
        if !self.store.connect_check().await {
            return CacheStatus::Disconnected;
        }
        match self.store.stats().await {
            Ok(stats) => CacheStatus::Connected(stats),
            Err(err) => CacheStatus::StatsUnavailable(err.to_string()),
        }
    }

    pub async fn clear(&self) -> bool {
        self.store.clear_all().await
    }

    /// Delete every key matching `pattern`; a blank pattern is rejected.
    pub async fn invalidate(&self, pattern: &str) -> Result<u64, DomainError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(DomainError::validation("Pattern is required"));
        }
        let deleted = self.store.delete_pattern(pattern).await;
        info!(cache = "admin", pattern, deleted, "Cache pattern invalidated");
        Ok(deleted)
    }

    /// Keys matching `pattern`, defaulting to everything in the namespace.
    pub async fn keys(&self, pattern: Option<&str>) -> Result<KeyListing, CacheError> {
        let pattern = match pattern.map(str::trim).filter(|value| !value.is_empty()) {
            Some(pattern) => pattern.to_string(),
            None => self.store.config().namespace_pattern(),
        };
        self.store.list_keys(&pattern).await
    }

    /// Populate the cache for the default collection queries.
    pub async fn warmup(&self) -> Result<WarmupReport, ContentError> {
        let wordpress_posts = self.wordpress.posts(PostListQuery::default()).await.len();
        let articles = self.content.articles(ArticleListQuery::default()).await?.len();
        let products = self.content.products(ProductListQuery::default()).await?.len();
        let team_members = self.content.team_members().await?.len();

        let report = WarmupReport {
            wordpress_posts,
            articles,
            products,
            team_members,
        };
        info!(cache = "admin", ?report, "Cache warmed up");
        Ok(report)
    }
}

/// Human-readable remaining lifetime for a key listing.
pub fn format_expires_in(ttl: i64) -> String {
    if ttl > 0 {
        format!("{ttl}s")
    } else {
        "No expiration".to_string()
    }
}
