//! Redis-backed partition store.

use super::{expiry_secs, CacheStore, KeyTtl, ServerInfo};
use crate::partition::CacheDatabase;
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, PoolError, Runtime};
use fature_config::CacheConfig;
use fature_core::{FatureError, FatureResult};
use redis::{ErrorKind, InfoDict, RedisError};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// One logical Redis database behind a connection pool.
pub struct RedisCacheStore {
    pool: Pool,
    database: CacheDatabase,
    socket_timeout: Duration,
    retry_on_timeout: bool,
    decode_responses: bool,
}

impl RedisCacheStore {
    /// Creates the pool for `database`.
    ///
    /// The pool is built immediately; its connections are opened lazily, each
    /// bounded by the connect timeout.
    pub fn connect(config: &CacheConfig, database: CacheDatabase) -> FatureResult<Self> {
        let url = config.connection_url(database.index())?;

        let pool = Config::from_url(url)
            .builder()
            .map_err(|e| FatureError::Configuration(format!("Invalid Redis config: {}", e)))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .create_timeout(Some(config.connect_timeout()))
            .wait_timeout(Some(config.connect_timeout()))
            .build()
            .map_err(|e| FatureError::Configuration(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            partition = %database,
            url = %config.redacted_url(database.index()),
            pool_size = config.pool_size,
            "Created Redis pool"
        );

        Ok(Self {
            pool,
            database,
            socket_timeout: config.socket_timeout(),
            retry_on_timeout: config.retry_on_timeout,
            decode_responses: config.decode_responses,
        })
    }

    /// Partition this store serves.
    #[must_use]
    pub const fn database(&self) -> CacheDatabase {
        self.database
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> FatureResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| pool_error(self.database, e))
    }

    /// Runs a command under the socket timeout, retrying it once on timeout
    /// when configured to.
    async fn run<T, F, Fut>(&self, op: &'static str, key: &str, command: F) -> FatureResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FatureResult<T>>,
    {
        match timeout(self.socket_timeout, command()).await {
            Ok(result) => result,
            Err(_) if self.retry_on_timeout => {
                warn!(partition = %self.database, op, key, "Redis command timed out, retrying once");
                timeout(self.socket_timeout, command())
                    .await
                    .map_err(|_| self.timed_out(op, key))?
            }
            Err(_) => Err(self.timed_out(op, key)),
        }
    }

    fn timed_out(&self, op: &str, key: &str) -> FatureError {
        FatureError::Timeout(format!(
            "{} '{}' on {} exceeded {:?}",
            op, key, self.database, self.socket_timeout
        ))
    }

    fn decode_text(&self, key: &str, raw: Vec<u8>) -> FatureResult<String> {
        if self.decode_responses {
            return Ok(String::from_utf8_lossy(&raw).into_owned());
        }
        String::from_utf8(raw)
            .map_err(|e| FatureError::Cache(format!("Value of '{}' is not UTF-8: {}", key, e)))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> FatureResult<Option<String>> {
        let raw: Option<Vec<u8>> = self
            .run("GET", key, move || async move {
                let mut conn = self.conn().await?;
                conn.get(key).await.map_err(|e| redis_error("GET", key, e))
            })
            .await?;

        raw.map(|bytes| self.decode_text(key, bytes)).transpose()
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> FatureResult<()> {
        let secs = expiry_secs(ttl);
        self.run("SETEX", key, move || async move {
            let mut conn = self.conn().await?;
            conn.set_ex::<_, _, ()>(key, value, secs)
                .await
                .map_err(|e| redis_error("SETEX", key, e))
        })
        .await?;

        debug!(partition = %self.database, key, ttl_secs = secs, "Stored key");
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> FatureResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let label = keys.first().map_or("", String::as_str);
        self.run("DEL", label, move || async move {
            let mut conn = self.conn().await?;
            conn.del::<_, u64>(keys)
                .await
                .map_err(|e| redis_error("DEL", label, e))
        })
        .await
    }

    async fn scan_match(&self, pattern: &str) -> FatureResult<Vec<String>> {
        self.run("SCAN", pattern, move || async move {
            let mut conn = self.conn().await?;
            let mut iter = conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(|e| redis_error("SCAN", pattern, e))?;

            // SCAN may report a key more than once.
            let mut keys = BTreeSet::new();
            while let Some(key) = iter.next_item().await {
                keys.insert(key);
            }
            Ok(keys.into_iter().collect())
        })
        .await
    }

    async fn set_add(&self, key: &str, member: &str) -> FatureResult<bool> {
        let added: i64 = self
            .run("SADD", key, move || async move {
                let mut conn = self.conn().await?;
                conn.sadd(key, member).await.map_err(|e| redis_error("SADD", key, e))
            })
            .await?;
        Ok(added > 0)
    }

    async fn set_add_expire(&self, key: &str, member: &str, ttl: Duration) -> FatureResult<bool> {
        let secs = i64::try_from(expiry_secs(ttl)).unwrap_or(i64::MAX);
        let (added,): (i64,) = self
            .run("SADD+EXPIRE", key, move || async move {
                let mut conn = self.conn().await?;
                redis::pipe()
                    .atomic()
                    .sadd(key, member)
                    .expire(key, secs)
                    .ignore()
                    .query_async(&mut *conn)
                    .await
                    .map_err(|e| redis_error("SADD+EXPIRE", key, e))
            })
            .await?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> FatureResult<bool> {
        let removed: i64 = self
            .run("SREM", key, move || async move {
                let mut conn = self.conn().await?;
                conn.srem(key, member).await.map_err(|e| redis_error("SREM", key, e))
            })
            .await?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> FatureResult<Vec<String>> {
        self.run("SMEMBERS", key, move || async move {
            let mut conn = self.conn().await?;
            conn.smembers(key)
                .await
                .map_err(|e| redis_error("SMEMBERS", key, e))
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> FatureResult<bool> {
        let secs = i64::try_from(expiry_secs(ttl)).unwrap_or(i64::MAX);
        self.run("EXPIRE", key, move || async move {
            let mut conn = self.conn().await?;
            conn.expire(key, secs)
                .await
                .map_err(|e| redis_error("EXPIRE", key, e))
        })
        .await
    }

    async fn ttl(&self, key: &str) -> FatureResult<KeyTtl> {
        let reply: i64 = self
            .run("TTL", key, move || async move {
                let mut conn = self.conn().await?;
                conn.ttl(key).await.map_err(|e| redis_error("TTL", key, e))
            })
            .await?;
        Ok(KeyTtl::from_reply(reply))
    }

    async fn ping(&self) -> FatureResult<()> {
        self.run("PING", "", move || async move {
            let mut conn = self.conn().await?;
            redis::cmd("PING")
                .query_async::<String>(&mut *conn)
                .await
                .map(|_| ())
                .map_err(|e| redis_error("PING", "", e))
        })
        .await
    }

    async fn flush(&self) -> FatureResult<()> {
        self.run("FLUSHDB", "", move || async move {
            let mut conn = self.conn().await?;
            redis::cmd("FLUSHDB")
                .query_async::<()>(&mut *conn)
                .await
                .map_err(|e| redis_error("FLUSHDB", "", e))
        })
        .await?;

        info!(partition = %self.database, "Flushed partition");
        Ok(())
    }

    async fn info(&self) -> FatureResult<ServerInfo> {
        let info: InfoDict = self
            .run("INFO", "", move || async move {
                let mut conn = self.conn().await?;
                redis::cmd("INFO")
                    .query_async::<InfoDict>(&mut *conn)
                    .await
                    .map_err(|e| redis_error("INFO", "", e))
            })
            .await?;

        Ok(ServerInfo {
            used_memory_human: info.get("used_memory_human"),
            connected_clients: info.get("connected_clients"),
            total_commands_processed: info.get("total_commands_processed"),
            keyspace_hits: info.get("keyspace_hits").unwrap_or(0),
            keyspace_misses: info.get("keyspace_misses").unwrap_or(0),
        })
    }
}

/// Classifies a Redis failure: transport problems become connectivity
/// errors, everything the server rejected stays a cache error.
fn redis_error(op: &str, key: &str, err: RedisError) -> FatureError {
    let message = format!("{} '{}' failed: {}", op, key, err);
    if err.is_timeout() {
        FatureError::Timeout(message)
    } else if err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_io_error()
        || err.kind() == ErrorKind::AuthenticationFailed
    {
        FatureError::Connection(message)
    } else {
        FatureError::Cache(message)
    }
}

fn pool_error(database: CacheDatabase, err: PoolError) -> FatureError {
    match err {
        PoolError::Timeout(kind) => {
            FatureError::Timeout(format!("Redis pool for {} timed out ({:?})", database, kind))
        }
        PoolError::Backend(e) => redis_error("CONNECT", database.as_str(), e),
        other => FatureError::Connection(format!(
            "Failed to get Redis connection for {}: {}",
            database, other
        )),
    }
}
