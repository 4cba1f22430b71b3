//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    ArticleChanges, ArticleRecord, NewArticle, ProductRecord, TeamMemberRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn list_articles(&self, limit: i64, offset: i64) -> Result<Vec<ArticleRecord>, RepoError>;

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;
}

/// Article writes. Each call is one committed transaction.
#[async_trait]
pub trait ArticlesWriteRepo: Send + Sync {
    async fn create_article(&self, article: NewArticle) -> Result<ArticleRecord, RepoError>;

    /// `None` when no article has `id`.
    async fn update_article(
        &self,
        id: i64,
        changes: ArticleChanges,
    ) -> Result<Option<ArticleRecord>, RepoError>;

    /// `false` when no article has `id`.
    async fn delete_article(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ProductsRepo: Send + Sync {
    async fn list_products(&self, category: Option<&str>) -> Result<Vec<ProductRecord>, RepoError>;

    async fn find_product(&self, id: i64) -> Result<Option<ProductRecord>, RepoError>;
}

#[async_trait]
pub trait TeamRepo: Send + Sync {
    async fn list_team_members(&self) -> Result<Vec<TeamMemberRecord>, RepoError>;
}

/// Storage liveness, reported by `/api/health/db`.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
