//! WordPress origin contract and its cached query resolvers.
//!
//! Origin failures never reach the caller as errors: a failed list becomes an
//! empty list and a failed lookup becomes absent. Neither is cached, so the
//! next call asks the origin again.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::cache::{ById, CacheArgs, CacheStore, CallArgs, ReadThrough, ReadThroughOptions};
use crate::domain::entities::WordPressPost;

pub const DEFAULT_POST_LIMIT: i64 = 10;

const POSTS_QUERY: &str = r#"
query GetPosts($first: Int!) {
  posts(first: $first) {
    nodes {
      id
      databaseId
      title
      content
      excerpt
      date
      author { node { name } }
      categories { nodes { name } }
    }
  }
}
"#;

const POST_QUERY: &str = r#"
query GetPost($id: ID!) {
  post(id: $id, idType: DATABASE_ID) {
    id
    databaseId
    title
    content
    excerpt
    date
    author { node { name } }
    categories { nodes { name } }
  }
}
"#;

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("origin request failed: {0}")]
    Transport(String),
    #[error("origin responded with HTTP {0}")]
    Status(u16),
    #[error("origin returned GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("origin response could not be decoded: {0}")]
    Decode(String),
}

/// A remote GraphQL content source.
#[async_trait]
pub trait ContentOrigin: Send + Sync {
    /// Run `query` and return the response's `data` member.
    async fn fetch(&self, query: &str, variables: Value) -> Result<Value, OriginError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostListQuery {
    pub limit: i64,
}

impl Default for PostListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_POST_LIMIT,
        }
    }
}

impl CacheArgs for PostListQuery {
    fn call_args(&self) -> CallArgs {
        CallArgs::new().keyword("limit", self.limit)
    }
}

pub struct WordPressQueries {
    origin: Arc<dyn ContentOrigin>,
    post_list: ReadThrough,
    post_by_id: ReadThrough,
}

impl WordPressQueries {
    pub fn new(store: Arc<CacheStore>, origin: Arc<dyn ContentOrigin>) -> Self {
        Self {
            origin,
            post_list: ReadThrough::new(
                Arc::clone(&store),
                ReadThroughOptions::new("wp_posts", "wordpress_posts"),
            ),
            post_by_id: ReadThrough::new(store, ReadThroughOptions::new("wp_post", "wordpress_post")),
        }
    }

    pub async fn posts(&self, query: PostListQuery) -> Vec<WordPressPost> {
        let result = self
            .post_list
            .fetch(query, |query| async move {
                self.fetch_posts(query.limit).await.map(Some)
            })
            .await;

        match result {
            Ok(posts) => posts.unwrap_or_default(),
            Err(err) => {
                warn!(limit = query.limit, error = %err, "WordPress posts unavailable");
                Vec::new()
            }
        }
    }

    pub async fn post(&self, id: i64) -> Option<WordPressPost> {
        let result = self
            .post_by_id
            .fetch(ById(id), |ById(id)| async move { self.fetch_post(id).await })
            .await;

        match result {
            Ok(post) => post,
            Err(err) => {
                warn!(post_id = id, error = %err, "WordPress post unavailable");
                None
            }
        }
    }

    async fn fetch_posts(&self, limit: i64) -> Result<Vec<WordPressPost>, OriginError> {
        let data = self
            .origin
            .fetch(POSTS_QUERY, json!({ "first": limit }))
            .await?;
        let connection = data_member(&data, "posts")?;
        if connection.is_null() {
            return Ok(Vec::new());
        }
        let connection: Connection<PostNode> = serde_json::from_value(connection.clone())
            .map_err(|err| OriginError::Decode(err.to_string()))?;
        Ok(connection.nodes.into_iter().map(WordPressPost::from).collect())
    }

    async fn fetch_post(&self, id: i64) -> Result<Option<WordPressPost>, OriginError> {
        let data = self.origin.fetch(POST_QUERY, json!({ "id": id })).await?;
        let node = data_member(&data, "post")?;
        if node.is_null() {
            return Ok(None);
        }
        let node: PostNode = serde_json::from_value(node.clone())
            .map_err(|err| OriginError::Decode(err.to_string()))?;
        Ok(Some(node.into()))
    }
}

/// The named root field of a GraphQL `data` object.
///
/// A reply without the field is malformed; treating it as "no posts" would
/// let the empty result be cached.
fn data_member<'a>(data: &'a Value, field: &str) -> Result<&'a Value, OriginError> {
    data.as_object()
        .and_then(|object| object.get(field))
        .ok_or_else(|| OriginError::Decode(format!("response data has no `{field}` field")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostNode {
    id: String,
    database_id: Option<i64>,
    title: Option<String>,
    content: Option<String>,
    excerpt: Option<String>,
    date: Option<String>,
    author: Option<Edge<NamedNode>>,
    categories: Option<Connection<NamedNode>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Connection<T> {
    #[serde(default)]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NamedNode {
    name: Option<String>,
}

impl From<PostNode> for WordPressPost {
    fn from(node: PostNode) -> Self {
        Self {
            id: node.id,
            database_id: node.database_id,
            title: node.title,
            content: node.content,
            excerpt: node.excerpt,
            date: node.date,
            author: node
                .author
                .and_then(|edge| edge.node)
                .and_then(|author| author.name),
            categories: node
                .categories
                .map(|connection| {
                    connection
                        .nodes
                        .into_iter()
                        .filter_map(|category| category.name)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
