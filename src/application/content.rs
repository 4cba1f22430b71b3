//! Cached read paths over the relational store.

use std::sync::Arc;

use thiserror::Error;

use crate::application::repos::{ArticlesRepo, ProductsRepo, RepoError, TeamRepo};
use crate::cache::{ById, CacheArgs, CacheStore, CallArgs, ReadThrough, ReadThroughOptions};
use crate::domain::entities::{ArticleRecord, ProductRecord, TeamMemberRecord};
use crate::domain::error::DomainError;

pub const DEFAULT_ARTICLE_LIMIT: i64 = 10;
pub const DEFAULT_ARTICLE_OFFSET: i64 = 0;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleListQuery {
    pub limit: i64,
    pub offset: i64,
}

impl Default for ArticleListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ARTICLE_LIMIT,
            offset: DEFAULT_ARTICLE_OFFSET,
        }
    }
}

impl CacheArgs for ArticleListQuery {
    fn call_args(&self) -> CallArgs {
        CallArgs::new()
            .keyword("limit", self.limit)
            .keyword("offset", self.offset)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

impl CacheArgs for ProductListQuery {
    fn call_args(&self) -> CallArgs {
        CallArgs::new().keyword("category", self.category.clone())
    }
}

/// Query resolvers for articles, products and team members.
pub struct ContentQueries {
    articles: Arc<dyn ArticlesRepo>,
    products: Arc<dyn ProductsRepo>,
    team: Arc<dyn TeamRepo>,
    article_list: ReadThrough,
    article_by_id: ReadThrough,
    product_list: ReadThrough,
    product_by_id: ReadThrough,
    team_list: ReadThrough,
}

impl ContentQueries {
    pub fn new(
        store: Arc<CacheStore>,
        articles: Arc<dyn ArticlesRepo>,
        products: Arc<dyn ProductsRepo>,
        team: Arc<dyn TeamRepo>,
    ) -> Self {
        let cached = |key_prefix, operation| {
            ReadThrough::new(
                Arc::clone(&store),
                ReadThroughOptions::new(key_prefix, operation),
            )
        };
        Self {
            article_list: cached("articles", "articles"),
            article_by_id: cached("article", "article"),
            product_list: cached("products", "products"),
            product_by_id: cached("product", "product"),
            team_list: cached("team_members", "team_members"),
            articles,
            products,
            team,
        }
    }

    pub async fn articles(&self, query: ArticleListQuery) -> Result<Vec<ArticleRecord>, ContentError> {
        let query = ArticleListQuery {
            limit: query.limit.max(0),
            offset: query.offset.max(0),
        };
        let articles = self
            .article_list
            .fetch(query, |query| async move {
                self.articles
                    .list_articles(query.limit, query.offset)
                    .await
                    .map(Some)
            })
            .await?;
        Ok(articles.unwrap_or_default())
    }

    pub async fn article(&self, id: i64) -> Result<ArticleRecord, ContentError> {
        self.article_by_id
            .fetch(ById(id), |ById(id)| async move {
                self.articles.find_article(id).await
            })
            .await?
            .ok_or_else(|| DomainError::not_found("article", id).into())
    }

    pub async fn products(&self, query: ProductListQuery) -> Result<Vec<ProductRecord>, ContentError> {
        let products = self
            .product_list
            .fetch(query, |query| async move {
                self.products
                    .list_products(query.category.as_deref())
                    .await
                    .map(Some)
            })
            .await?;
        Ok(products.unwrap_or_default())
    }

    pub async fn product(&self, id: i64) -> Result<ProductRecord, ContentError> {
        self.product_by_id
            .fetch(ById(id), |ById(id)| async move {
                self.products.find_product(id).await
            })
            .await?
            .ok_or_else(|| DomainError::not_found("product", id).into())
    }

    pub async fn team_members(&self) -> Result<Vec<TeamMemberRecord>, ContentError> {
        let members = self
            .team_list
            .fetch((), |()| async move {
                self.team.list_team_members().await.map(Some)
            })
            .await?;
        Ok(members.unwrap_or_default())
    }
}
