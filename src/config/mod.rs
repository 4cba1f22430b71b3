//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::BackendKind;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "headway";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_REDIS_HOST: &str = "localhost";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_CACHE_NAMESPACE: &str = "graphql";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CONNECT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_CACHE_COMMAND_TIMEOUT_MS: u64 = 5000;
const DEFAULT_KEY_LISTING_LIMIT: usize = 100;
const DEFAULT_MEMORY_MAX_ENTRIES: usize = 10_000;
const DEFAULT_WORDPRESS_URL: &str = "http://localhost:8080/graphql";
const DEFAULT_WORDPRESS_TIMEOUT_SECS: u64 = 10;

/// Command-line arguments for the Headway binary.
#[derive(Debug, Parser)]
#[command(name = "headway", version, about = "Headway content API gateway")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "HEADWAY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Headway HTTP API.
    Serve(Box<ServeArgs>),
    /// Inspect or purge the response cache.
    Cache(CacheCommandArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Override the cache backend (redis|memory).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the Redis host.
    #[arg(long = "redis-host", value_name = "HOST")]
    pub redis_host: Option<String>,

    /// Override the Redis port.
    #[arg(long = "redis-port", value_name = "PORT")]
    pub redis_port: Option<u16>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub cache: CacheOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the WordPress GraphQL endpoint.
    #[arg(long = "wordpress-url", value_name = "URL")]
    pub wordpress_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CacheCommandArgs {
    #[command(flatten)]
    pub overrides: CacheOverrides,

    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CacheCommand {
    /// Report connectivity and hit statistics.
    Status,
    /// Remove every cached entry.
    Clear,
    /// Remove cached entries whose key matches a glob pattern.
    Invalidate(InvalidateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct InvalidateArgs {
    /// Glob pattern, e.g. `graphql:*articles*`.
    #[arg(value_name = "PATTERN")]
    pub pattern: String,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub wordpress: WordPressSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub backend: BackendKind,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub redis_db: i64,
    pub namespace: String,
    pub default_ttl: Duration,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub key_listing_limit: NonZeroUsize,
    pub memory_max_entries: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct WordPressSettings {
    pub graphql_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Bearer token for the cache administration routes. Required by `serve`.
    pub admin_token: Option<String>,
    /// Bearer tokens allowed to create, update and delete content.
    pub api_tokens: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("HEADWAY")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("auth.api_tokens")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Cache(args)) => raw.apply_cache_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    wordpress: RawWordPressSettings,
    auth: RawAuthSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.wordpress_url.as_ref() {
            self.wordpress.graphql_url = Some(url.clone());
        }
        self.apply_cache_overrides(&overrides.cache);
    }

    fn apply_cache_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(host) = overrides.redis_host.as_ref() {
            self.cache.redis_host = Some(host.clone());
        }
        if let Some(port) = overrides.redis_port {
            self.cache.redis_port = Some(port);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            wordpress,
            auth,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            wordpress: build_wordpress_settings(wordpress)?,
            auth: build_auth_settings(auth),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    Ok(DatabaseSettings {
        url,
        max_connections: non_zero_u32(max_connections.into(), "database.max_connections")?,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend {
        Some(value) => BackendKind::from_str(value.trim())
            .map_err(|reason| LoadError::invalid("cache.backend", reason))?,
        None => BackendKind::Redis,
    };

    let redis_port = cache.redis_port.unwrap_or(DEFAULT_REDIS_PORT);
    if redis_port == 0 {
        return Err(LoadError::invalid(
            "cache.redis_port",
            "port must be greater than zero",
        ));
    }

    let redis_db = cache.redis_db.unwrap_or(0);
    if redis_db < 0 {
        return Err(LoadError::invalid(
            "cache.redis_db",
            "must not be negative",
        ));
    }

    let namespace = cache
        .namespace
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CACHE_NAMESPACE.to_string());
    if namespace.is_empty() || namespace.contains(['*', '?', '[', ']']) {
        return Err(LoadError::invalid(
            "cache.namespace",
            "must be non-empty and free of glob characters",
        ));
    }

    let ttl_secs = cache.default_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.default_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let connect_timeout_ms = cache
        .connect_timeout_ms
        .unwrap_or(DEFAULT_CACHE_CONNECT_TIMEOUT_MS);
    if connect_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.connect_timeout_ms",
            "must be greater than zero",
        ));
    }
    let command_timeout_ms = cache
        .command_timeout_ms
        .unwrap_or(DEFAULT_CACHE_COMMAND_TIMEOUT_MS);
    if command_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.command_timeout_ms",
            "must be greater than zero",
        ));
    }

    let key_listing_limit = NonZeroUsize::new(
        cache
            .key_listing_limit
            .unwrap_or(DEFAULT_KEY_LISTING_LIMIT),
    )
    .ok_or_else(|| LoadError::invalid("cache.key_listing_limit", "must be greater than zero"))?;

    let memory_max_entries = NonZeroUsize::new(
        cache
            .memory_max_entries
            .unwrap_or(DEFAULT_MEMORY_MAX_ENTRIES),
    )
    .ok_or_else(|| LoadError::invalid("cache.memory_max_entries", "must be greater than zero"))?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        backend,
        redis_host: cache
            .redis_host
            .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
        redis_port,
        redis_password: non_blank(cache.redis_password),
        redis_db,
        namespace,
        default_ttl: Duration::from_secs(ttl_secs),
        connect_timeout: Duration::from_millis(connect_timeout_ms),
        command_timeout: Duration::from_millis(command_timeout_ms),
        key_listing_limit,
        memory_max_entries,
    })
}

fn build_wordpress_settings(
    wordpress: RawWordPressSettings,
) -> Result<WordPressSettings, LoadError> {
    let raw_url = wordpress
        .graphql_url
        .unwrap_or_else(|| DEFAULT_WORDPRESS_URL.to_string());
    let graphql_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("wordpress.graphql_url", format!("{err}")))?;
    if !matches!(graphql_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "wordpress.graphql_url",
            "scheme must be http or https",
        ));
    }

    let timeout_secs = wordpress
        .timeout_seconds
        .unwrap_or(DEFAULT_WORDPRESS_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "wordpress.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(WordPressSettings {
        graphql_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> AuthSettings {
    AuthSettings {
        admin_token: non_blank(auth.admin_token),
        api_tokens: auth
            .api_tokens
            .into_iter()
            .filter_map(|token| non_blank(Some(token)))
            .collect(),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    backend: Option<String>,
    redis_host: Option<String>,
    redis_port: Option<u16>,
    redis_password: Option<String>,
    redis_db: Option<i64>,
    namespace: Option<String>,
    default_ttl_seconds: Option<u64>,
    connect_timeout_ms: Option<u64>,
    command_timeout_ms: Option<u64>,
    key_listing_limit: Option<usize>,
    memory_max_entries: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWordPressSettings {
    graphql_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    admin_token: Option<String>,
    api_tokens: Vec<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }

    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;

    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
