use thiserror::Error;

/// Failures raised by key-value backends.
///
/// These stay inside the cache layer: [`CacheStore`](super::CacheStore) turns
/// them into misses and no-ops and only constructors and admin listings
/// return them to callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command `{op}` timed out")]
    Timeout { op: &'static str },
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("failed to serialize cache value")]
    Serialization(#[source] serde_json::Error),
    #[error("failed to deserialize cache value")]
    Deserialization(#[source] serde_json::Error),
    #[error("invalid cache configuration: {0}")]
    Configuration(String),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
