//! Article mutations: commit the write, then purge stale cache entries.

use std::sync::Arc;

use tracing::info;

use crate::application::content::ContentError;
use crate::application::repos::ArticlesWriteRepo;
use crate::cache::{EntityKind, Invalidator};
use crate::domain::entities::{ArticleChanges, ArticleRecord, NewArticle};
use crate::domain::error::DomainError;

pub struct ArticleMutations {
    repo: Arc<dyn ArticlesWriteRepo>,
    invalidator: Invalidator,
}

impl ArticleMutations {
    pub fn new(repo: Arc<dyn ArticlesWriteRepo>, invalidator: Invalidator) -> Self {
        Self { repo, invalidator }
    }

    pub async fn create(&self, article: NewArticle) -> Result<ArticleRecord, ContentError> {
        let article = NewArticle {
            title: required("title", article.title)?,
            content: required("content", article.content)?,
            author: article.author,
        };

        let created = self.repo.create_article(article).await?;
        // A new id cannot have cached lookups yet; only the lists are stale.
        let purged = self
            .invalidator
            .entity_changed(EntityKind::Article, None)
            .await;
        info!(article_id = created.id, purged, "Article created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i64,
        changes: ArticleChanges,
    ) -> Result<ArticleRecord, ContentError> {
        let changes = ArticleChanges {
            title: changes
                .title
                .map(|title| required("title", title))
                .transpose()?,
            ..changes
        };

        let updated = self
            .repo
            .update_article(id, changes)
            .await?
            .ok_or_else(|| DomainError::not_found("article", id))?;
        let purged = self
            .invalidator
            .entity_changed(EntityKind::Article, Some(id))
            .await;
        info!(article_id = id, purged, "Article updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        if !self.repo.delete_article(id).await? {
            return Err(DomainError::not_found("article", id).into());
        }
        let purged = self
            .invalidator
            .entity_changed(EntityKind::Article, Some(id))
            .await;
        info!(article_id = id, purged, "Article deleted");
        Ok(())
    }
}

fn required(field: &'static str, value: String) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("title", "  A ".to_string()).expect("valid"), "A");
        assert!(matches!(
            required("title", "   ".to_string()),
            Err(DomainError::Validation { .. })
        ));
    }
}
