//! Domain records mirrored from persistent storage and the WordPress origin.
//!
//! Records derive both `Serialize` and `Deserialize`: the serialized form is
//! the flattened projection kept in the cache and returned by the API.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub author: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub sku: Option<String>,
    pub category: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberRecord {
    pub id: i64,
    pub name: String,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A post as served by the WordPress GraphQL origin.
///
/// `date` is kept as the origin's string; WordPress emits local time without
/// an offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPressPost {
    pub id: String,
    pub database_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Fields accepted when creating an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
}

/// Partial article update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.author.is_none()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn article_round_trips_through_json() {
        let article = ArticleRecord {
            id: 1,
            title: "A".to_string(),
            content: Some("B".to_string()),
            author: None,
            published_date: None,
            created_at: datetime!(2024-05-01 10:00 UTC),
            updated_at: datetime!(2024-05-01 10:00 UTC),
        };
        let json = serde_json::to_value(&article).expect("serialize");
        assert_eq!(json["created_at"], "2024-05-01T10:00:00Z");
        assert!(json["published_date"].is_null());

        let back: ArticleRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, article);
    }

    #[test]
    fn empty_changes() {
        assert!(ArticleChanges::default().is_empty());
        let changes = ArticleChanges {
            author: Some("x".to_string()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
