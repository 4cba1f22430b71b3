//! Cache configuration.
//!
//! Selects the key-value backend and carries the timeouts, TTL and namespace
//! used by the store and the read-through decorators.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_NAMESPACE: &str = "graphql";
const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_REDIS_HOST: &str = "localhost";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;
const DEFAULT_KEY_LISTING_LIMIT: usize = 100;
const DEFAULT_MEMORY_MAX_ENTRIES: usize = 10_000;

/// Which key-value store sits behind the [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Redis,
    Memory,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Redis => "redis",
            BackendKind::Memory => "memory",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisEndpoint {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

impl Default for RedisEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT,
            password: None,
            db: 0,
        }
    }
}

impl RedisEndpoint {
    /// Connection URL understood by `redis::Client::open`.
    pub fn url(&self) -> Result<url::Url, String> {
        let base = format!("redis://{}:{}/{}", self.host, self.port, self.db);
        let mut url =
            url::Url::parse(&base).map_err(|err| format!("invalid redis address: {err}"))?;
        if let Some(password) = self.password.as_deref().filter(|value| !value.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| "redis url cannot carry a password".to_string())?;
        }
        Ok(url)
    }

    /// Address for log lines; never includes the password.
    pub fn display_addr(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Cache configuration, resolved from the `[cache]` settings section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false the store is built over an always-unavailable backend.
    pub enabled: bool,
    pub backend: BackendKind,
    pub redis: RedisEndpoint,
    /// Prefix partitioning this cache's keys from other users of the store.
    pub namespace: String,
    /// TTL applied by read-through decorators that do not set their own.
    pub default_ttl_seconds: u64,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
    /// Page size of the debug key listing.
    pub key_listing_limit: usize,
    /// Capacity of the in-process backend; least recently used entries are evicted past it.
    pub memory_max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: BackendKind::Redis,
            redis: RedisEndpoint::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl_seconds: DEFAULT_TTL_SECS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            key_listing_limit: DEFAULT_KEY_LISTING_LIMIT,
            memory_max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis: RedisEndpoint {
                host: settings.redis_host.clone(),
                port: settings.redis_port,
                password: settings.redis_password.clone(),
                db: settings.redis_db,
            },
            namespace: settings.namespace.clone(),
            default_ttl_seconds: settings.default_ttl.as_secs(),
            connect_timeout_ms: duration_ms(settings.connect_timeout),
            command_timeout_ms: duration_ms(settings.command_timeout),
            key_listing_limit: settings.key_listing_limit.get(),
            memory_max_entries: settings.memory_max_entries.get(),
        }
    }
}

impl CacheConfig {
    /// In-memory configuration used by tests and single-process deployments.
    pub fn memory() -> Self {
        Self {
            backend: BackendKind::Memory,
            ..Self::default()
        }
    }

    /// Default TTL, clamped to one second so no entry is ever stored without expiry.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    /// Listing cap, clamped to 1 if zero.
    pub fn key_listing_limit(&self) -> usize {
        self.key_listing_limit.max(1)
    }

    /// Memory backend capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_max_entries).unwrap_or(NonZeroUsize::MIN)
    }

    /// Pattern covering every key this cache owns.
    pub fn namespace_pattern(&self) -> String {
        format!("{}:*", self.namespace)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
