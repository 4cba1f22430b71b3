//! In-process collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use headway::application::articles::ArticleMutations;
use headway::application::auth::StaticTokenAuthorizer;
use headway::application::cache_admin::CacheAdmin;
use headway::application::content::ContentQueries;
use headway::application::repos::{
    ArticlesRepo, ArticlesWriteRepo, HealthRepo, ProductsRepo, RepoError, TeamRepo,
};
use headway::application::wordpress::{ContentOrigin, OriginError, WordPressQueries};
use headway::cache::{
    CacheConfig, CacheError, CacheStore, Invalidator, KeyValueBackend, MemoryBackend, StoreStats,
};
use headway::domain::entities::{
    ArticleChanges, ArticleRecord, NewArticle, ProductRecord, TeamMemberRecord,
};
use headway::infra::http::{ApiState, build_router};
use serde_json::{Value, json};
use time::OffsetDateTime;

pub const ADMIN_TOKEN: &str = "admin-secret";
pub const API_TOKEN: &str = "writer-secret";

/// Articles, products and team members held in memory, with call counters.
#[derive(Default)]
pub struct InMemoryContent {
    articles: Mutex<BTreeMap<i64, ArticleRecord>>,
    next_id: AtomicI64,
    products: Mutex<Vec<ProductRecord>>,
    team: Mutex<Vec<TeamMemberRecord>>,
    pub article_list_calls: AtomicUsize,
    pub article_lookups: AtomicUsize,
    pub product_list_calls: AtomicUsize,
    pub healthy: AtomicBool,
}

impl InMemoryContent {
    pub fn new() -> Arc<Self> {
        let content = Self {
            healthy: AtomicBool::new(true),
            ..Self::default()
        };
        Arc::new(content)
    }

    pub fn seed_article(&self, title: &str) -> ArticleRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = OffsetDateTime::now_utc();
        let record = ArticleRecord {
            id,
            title: title.to_string(),
            content: Some(format!("{title} body")),
            author: None,
            published_date: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.articles
            .lock()
            .expect("articles lock")
            .insert(id, record.clone());
        record
    }

    pub fn seed_product(&self, id: i64, name: &str, category: Option<&str>) {
        let now = OffsetDateTime::now_utc();
        self.products.lock().expect("products lock").push(ProductRecord {
            id,
            name: name.to_string(),
            description: None,
            price: Some(9.5),
            sku: Some(format!("SKU-{id}")),
            category: category.map(str::to_string),
            created_at: now,
            updated_at: now,
        });
    }

    pub fn seed_team_member(&self, id: i64, name: &str) {
        let now = OffsetDateTime::now_utc();
        self.team.lock().expect("team lock").push(TeamMemberRecord {
            id,
            name: name.to_string(),
            job_title: Some("Editor".to_string()),
            bio: None,
            created_at: now,
            updated_at: now,
        });
    }

    pub fn article_list_calls(&self) -> usize {
        self.article_list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticlesRepo for InMemoryContent {
    async fn list_articles(&self, limit: i64, offset: i64) -> Result<Vec<ArticleRecord>, RepoError> {
        self.article_list_calls.fetch_add(1, Ordering::SeqCst);
        let articles = self.articles.lock().expect("articles lock");
        Ok(articles
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        self.article_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.articles.lock().expect("articles lock").get(&id).cloned())
    }
}

#[async_trait]
impl ArticlesWriteRepo for InMemoryContent {
    async fn create_article(&self, article: NewArticle) -> Result<ArticleRecord, RepoError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = OffsetDateTime::now_utc();
        let record = ArticleRecord {
            id,
            title: article.title,
            content: Some(article.content),
            author: article.author,
            published_date: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.articles
            .lock()
            .expect("articles lock")
            .insert(id, record.clone());
        Ok(record)
    }

    async fn update_article(
        &self,
        id: i64,
        changes: ArticleChanges,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let mut articles = self.articles.lock().expect("articles lock");
        let Some(record) = articles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            record.title = title;
        }
        if let Some(content) = changes.content {
            record.content = Some(content);
        }
        if let Some(author) = changes.author {
            record.author = Some(author);
        }
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Some(record.clone()))
    }

    async fn delete_article(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self
            .articles
            .lock()
            .expect("articles lock")
            .remove(&id)
            .is_some())
    }
}

#[async_trait]
impl ProductsRepo for InMemoryContent {
    async fn list_products(&self, category: Option<&str>) -> Result<Vec<ProductRecord>, RepoError> {
        self.product_list_calls.fetch_add(1, Ordering::SeqCst);
        let products = self.products.lock().expect("products lock");
        Ok(products
            .iter()
            .filter(|product| category.is_none() || product.category.as_deref() == category)
            .cloned()
            .collect())
    }

    async fn find_product(&self, id: i64) -> Result<Option<ProductRecord>, RepoError> {
        let products = self.products.lock().expect("products lock");
        Ok(products.iter().find(|product| product.id == id).cloned())
    }
}

#[async_trait]
impl TeamRepo for InMemoryContent {
    async fn list_team_members(&self) -> Result<Vec<TeamMemberRecord>, RepoError> {
        Ok(self.team.lock().expect("team lock").clone())
    }
}

#[async_trait]
impl HealthRepo for InMemoryContent {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

/// WordPress origin returning a fixed post list, or failing on demand.
#[derive(Default)]
pub struct FakeOrigin {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl FakeOrigin {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentOrigin for FakeOrigin {
    async fn fetch(&self, query: &str, _variables: Value) -> Result<Value, OriginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(OriginError::Transport("connection refused".to_string()));
        }
        let node = json!({
            "id": "cG9zdDox",
            "databaseId": 1,
            "title": "Hello from WordPress",
            "content": "<p>Hello</p>",
            "excerpt": null,
            "date": "2024-01-01T00:00:00",
            "author": { "node": { "name": "admin" } },
            "categories": { "nodes": [{ "name": "News" }] }
        });
        if query.contains("GetPosts") {
            Ok(json!({ "posts": { "nodes": [node] } }))
        } else {
            Ok(json!({ "post": node }))
        }
    }
}

/// Wraps a backend and counts every call by operation name.
pub struct CountingBackend {
    inner: Arc<dyn KeyValueBackend>,
    down: AtomicBool,
    calls: Mutex<BTreeMap<&'static str, usize>>,
}

impl CountingBackend {
    pub fn new(inner: Arc<dyn KeyValueBackend>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            down: AtomicBool::new(false),
            calls: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(op)
            .copied()
            .unwrap_or(0)
    }

    /// Calls to anything other than `ping`.
    pub fn data_calls(&self) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(op, _)| **op != "ping")
            .map(|(_, count)| *count)
            .sum()
    }

    fn record(&self, op: &'static str) -> Result<(), CacheError> {
        *self.calls.lock().expect("calls lock").entry(op).or_default() += 1;
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::unavailable("backend is down"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.record("ping")?;
        self.inner.ping().await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.record("get")?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.record("set_ex")?;
        self.inner.set_ex(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<u64, CacheError> {
        self.record("del")?;
        self.inner.del(key).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.record("keys")?;
        self.inner.keys(pattern).await
    }

    async fn del_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.record("del_many")?;
        self.inner.del_many(keys).await
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.record("flush")?;
        self.inner.flush().await
    }

    async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        self.record("ttl")?;
        self.inner.ttl(key).await
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        self.record("stats")?;
        self.inner.stats().await
    }
}

pub fn memory_store() -> Arc<CacheStore> {
    Arc::new(CacheStore::with_backend(
        CacheConfig::memory(),
        Arc::new(MemoryBackend::new()),
    ))
}

/// Everything behind the HTTP router, wired the way `serve` wires it.
pub struct TestApp {
    pub store: Arc<CacheStore>,
    pub content: Arc<InMemoryContent>,
    pub origin: Arc<FakeOrigin>,
    pub state: ApiState,
}

impl TestApp {
    pub fn new(store: Arc<CacheStore>) -> Self {
        let content = InMemoryContent::new();
        let origin = Arc::new(FakeOrigin::default());

        let queries = Arc::new(ContentQueries::new(
            Arc::clone(&store),
            content.clone(),
            content.clone(),
            content.clone(),
        ));
        let wordpress = Arc::new(WordPressQueries::new(Arc::clone(&store), origin.clone()));
        let articles = Arc::new(ArticleMutations::new(
            content.clone(),
            Invalidator::new(Arc::clone(&store)),
        ));
        let cache = Arc::new(CacheAdmin::new(
            Arc::clone(&store),
            Arc::clone(&queries),
            Arc::clone(&wordpress),
        ));

        let state = ApiState {
            content: queries,
            wordpress,
            articles,
            cache,
            authorizer: Arc::new(StaticTokenAuthorizer::new([API_TOKEN])),
            admin_token: Arc::from(ADMIN_TOKEN),
            db: content.clone(),
        };

        Self {
            store,
            content,
            origin,
            state,
        }
    }

    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }
}
