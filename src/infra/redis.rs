//! Redis implementation of the cache backend.
//!
//! Uses a lazily established `ConnectionManager`; every command is bounded by
//! the configured command timeout and pattern scans use `SCAN` so a large
//! keyspace never blocks the server.
//!
//! Connecting happens outside the slot lock, so concurrent callers each wait
//! at most one connect timeout. A failed attempt makes callers fail fast for
//! [`RECONNECT_BACKOFF`] before the next attempt.

use std::time::Duration;

use async_trait::async_trait;
use redis::{FromRedisValue, aio::ConnectionManager};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, CacheError, KeyValueBackend, StoreStats};

const SCAN_BATCH: usize = 100;
const DEL_BATCH: usize = 500;
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

enum ConnectionSlot {
    Idle,
    Ready(ConnectionManager),
    Failed { retry_at: Instant },
}

pub struct RedisBackend {
    client: redis::Client,
    connection: Mutex<ConnectionSlot>,
    endpoint: String,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisBackend {
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let url = config.redis.url().map_err(CacheError::configuration)?;
        let client = redis::Client::open(url.as_str())
            .map_err(|err| CacheError::configuration(format!("invalid redis url: {err}")))?;

        Ok(Self {
            client,
            connection: Mutex::new(ConnectionSlot::Idle),
            endpoint: config.redis.display_addr(),
            connect_timeout: config.connect_timeout(),
            command_timeout: config.command_timeout(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        match &*self.connection.lock().await {
            ConnectionSlot::Ready(connection) => return Ok(connection.clone()),
            ConnectionSlot::Failed { retry_at } if Instant::now() < *retry_at => {
                return Err(CacheError::unavailable(format!(
                    "redis at {} is unreachable; waiting before reconnecting",
                    self.endpoint
                )));
            }
            ConnectionSlot::Failed { .. } | ConnectionSlot::Idle => {}
        }

        let connecting = ConnectionManager::new(self.client.clone());
        let outcome = match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(Ok(connection)) => Ok(connection),
            Ok(Err(err)) => Err(CacheError::unavailable(format!(
                "redis connection to {} failed: {err}",
                self.endpoint
            ))),
            Err(_) => Err(CacheError::Timeout { op: "connect" }),
        };

        let mut slot = self.connection.lock().await;
        if let ConnectionSlot::Ready(existing) = &*slot {
            return Ok(existing.clone());
        }
        match outcome {
            Ok(connection) => {
                info!(endpoint = %self.endpoint, "Redis cache connected");
                *slot = ConnectionSlot::Ready(connection.clone());
                Ok(connection)
            }
            Err(err) => {
                warn!(
                    endpoint = %self.endpoint,
                    error = %err,
                    backoff_ms = RECONNECT_BACKOFF.as_millis() as u64,
                    "Redis cache connection failed"
                );
                *slot = ConnectionSlot::Failed {
                    retry_at: Instant::now() + RECONNECT_BACKOFF,
                };
                Err(err)
            }
        }
    }

    async fn run<T>(&self, op: &'static str, cmd: redis::Cmd) -> Result<T, CacheError>
    where
        T: FromRedisValue + Send,
    {
        let mut connection = self.connection().await?;
        match tokio::time::timeout(self.command_timeout, cmd.query_async::<T>(&mut connection))
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CacheError::backend(format!("redis {op} failed: {err}"))),
            Err(_) => Err(CacheError::Timeout { op }),
        }
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let reply: String = self.run("ping", redis::cmd("PING")).await?;
        if reply.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(CacheError::backend(format!("unexpected PING reply `{reply}`")))
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("get", cmd).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(ttl.as_secs().max(1)).arg(value);
        self.run("setex", cmd).await
    }

    async fn del(&self, key: &str) -> Result<u64, CacheError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.run("del", cmd).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH);
            let (next, batch): (u64, Vec<String>) = self.run("scan", cmd).await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        // SCAN may return a key more than once.
        keys.sort();
        keys.dedup();
        debug!(pattern, matched = keys.len(), "Redis keys scanned");
        Ok(keys)
    }

    async fn del_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut removed = 0;
        for chunk in keys.chunks(DEL_BATCH) {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(chunk);
            let count: u64 = self.run("del", cmd).await?;
            removed += count;
        }
        Ok(removed)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.run("flushdb", redis::cmd("FLUSHDB")).await
    }

    async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key);
        self.run("ttl", cmd).await
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        let mut cmd = redis::cmd("INFO");
        cmd.arg("stats");
        let info: String = self.run("info", cmd).await?;
        Ok(parse_info_stats(&info))
    }

    async fn close(&self) {
        let mut slot = self.connection.lock().await;
        if let ConnectionSlot::Ready(_) = std::mem::replace(&mut *slot, ConnectionSlot::Idle) {
            info!(endpoint = %self.endpoint, "Redis cache connection released");
        }
    }
}

/// Extract the counters we report from an `INFO stats` reply.
fn parse_info_stats(info: &str) -> StoreStats {
    let mut stats = StoreStats::default();
    for line in info.lines() {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<u64>() else {
            continue;
        };
        match name {
            "total_commands_processed" => stats.total_commands_processed = value,
            "keyspace_hits" => stats.keyspace_hits = value,
            "keyspace_misses" => stats.keyspace_misses = value,
            _ => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_info_stats_reply() {
        let reply = "# Stats\r\n\
                     total_connections_received:12\r\n\
                     total_commands_processed:1500\r\n\
                     keyspace_hits:800\r\n\
                     keyspace_misses:200\r\n\
                     evicted_keys:0\r\n";
        let stats = parse_info_stats(reply);
        assert_eq!(stats.total_commands_processed, 1500);
        assert_eq!(stats.keyspace_hits, 800);
        assert_eq!(stats.keyspace_misses, 200);
        assert_eq!(stats.hit_rate(), 80.0);
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let stats = parse_info_stats("# Stats\r\nrejected_connections:0\r\n");
        assert_eq!(stats, StoreStats::default());
    }

    #[test]
    fn new_does_not_connect() {
        let config = CacheConfig {
            redis: crate::cache::RedisEndpoint {
                host: "127.0.0.1".to_string(),
                port: 1,
                ..Default::default()
            },
            ..CacheConfig::default()
        };
        let backend = RedisBackend::new(&config).expect("client");
        assert_eq!(backend.name(), "redis");
    }

    #[tokio::test]
    async fn unreachable_server_fails_ping_within_timeout() {
        let config = CacheConfig {
            redis: crate::cache::RedisEndpoint {
                host: "127.0.0.1".to_string(),
                port: 1,
                ..Default::default()
            },
            connect_timeout_ms: 200,
            command_timeout_ms: 200,
            ..CacheConfig::default()
        };
        let backend = RedisBackend::new(&config).expect("client");
        assert!(backend.ping().await.is_err());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_connect_timeout() {
        // Accepts at the TCP level but never answers, so the handshake hangs.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener");
        let port = listener.local_addr().expect("addr").port();
        let config = CacheConfig {
            redis: crate::cache::RedisEndpoint {
                host: "127.0.0.1".to_string(),
                port,
                db: 1,
                ..Default::default()
            },
            connect_timeout_ms: 300,
            command_timeout_ms: 300,
            ..CacheConfig::default()
        };
        let backend = RedisBackend::new(&config).expect("client");

        let started = std::time::Instant::now();
        let (a, b, c, d) = tokio::join!(
            backend.ping(),
            backend.ping(),
            backend.ping(),
            backend.ping()
        );
        assert!([a, b, c, d].iter().all(Result::is_err));
        assert!(
            started.elapsed() < Duration::from_millis(600),
            "took {:?}",
            started.elapsed()
        );

        let retried = std::time::Instant::now();
        assert!(backend.ping().await.is_err());
        assert!(retried.elapsed() < Duration::from_millis(100));
        drop(listener);
    }
}
