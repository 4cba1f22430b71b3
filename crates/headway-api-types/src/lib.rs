//! Request and response bodies shared by the headway HTTP surface and its clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

// ----- content mutations -----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleCreateRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleUpdateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Outcome of an article mutation. `article` is absent for deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub article: Option<T>,
}

// ----- cache administration -----

/// Body of `GET /api/cache/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheStatusResponse {
    Connected {
        status: String,
        total_commands_processed: u64,
        keyspace_hits: u64,
        keyspace_misses: u64,
        hit_rate: f64,
    },
    StatsUnavailable {
        status: String,
        message: String,
        error: String,
    },
    Disconnected {
        status: String,
        message: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKeyEntry {
    pub key: String,
    /// Remaining lifetime in seconds as reported by the store (`-1` no expiry, `-2` gone).
    pub ttl: i64,
    pub expires_in: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKeyListing {
    pub total_keys: usize,
    pub keys: Vec<CacheKeyEntry>,
    pub showing: usize,
}
