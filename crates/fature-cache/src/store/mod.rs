//! Storage handle behind one partition.
//!
//! The trait mirrors the handful of Redis commands the accessors need. It
//! stays text-only so it remains object safe; encoding lives in
//! [`crate::codec`].

mod memory_store;
mod redis_store;

pub use memory_store::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

use async_trait::async_trait;
use fature_core::FatureResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remaining lifetime of a key, as reported by `TTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist.
    Missing,
    /// The key exists without an expiry.
    Persistent,
    /// The key expires after this long.
    Expires(Duration),
}

impl KeyTtl {
    /// Maps the integer reply of `TTL`.
    #[must_use]
    pub fn from_reply(reply: i64) -> Self {
        match reply {
            -2 => Self::Missing,
            r if r < 0 => Self::Persistent,
            r => Self::Expires(Duration::from_secs(r.unsigned_abs())),
        }
    }

    /// Returns the remaining lifetime, if the key has one.
    #[must_use]
    pub const fn remaining(self) -> Option<Duration> {
        match self {
            Self::Expires(d) => Some(d),
            Self::Missing | Self::Persistent => None,
        }
    }
}

/// Server usage counters, as reported by `INFO`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Human readable memory usage (e.g. `1.05M`).
    pub used_memory_human: Option<String>,
    /// Number of connected clients.
    pub connected_clients: Option<u64>,
    /// Total commands processed by the server.
    pub total_commands_processed: Option<u64>,
    /// Successful key lookups.
    pub keyspace_hits: u64,
    /// Failed key lookups.
    pub keyspace_misses: u64,
}

/// Text key-value operations against one partition.
///
/// Every call is a single round trip (or its in-process equivalent). None of
/// the operations retry at this level except where the Redis transport is
/// configured to retry a timed-out command once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a string entry. `None` when the key is missing or expired.
    async fn get(&self, key: &str) -> FatureResult<Option<String>>;

    /// Writes a string entry with an expiry, overwriting unconditionally.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> FatureResult<()>;

    /// Deletes keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> FatureResult<u64>;

    /// Lists keys matching a glob pattern (`*`, `?`, `[..]`, `\` escapes).
    async fn scan_match(&self, pattern: &str) -> FatureResult<Vec<String>>;

    /// Adds a member to a set. Returns true if it was not already present.
    async fn set_add(&self, key: &str, member: &str) -> FatureResult<bool>;

    /// Adds a member to a set and (re)sets the set's expiry in one atomic
    /// step. Returns true if the member was not already present.
    async fn set_add_expire(&self, key: &str, member: &str, ttl: Duration) -> FatureResult<bool>;

    /// Removes a member from a set. Returns true if it was present.
    async fn set_remove(&self, key: &str, member: &str) -> FatureResult<bool>;

    /// Lists the members of a set, empty when the key is missing.
    async fn set_members(&self, key: &str) -> FatureResult<Vec<String>>;

    /// Sets the expiry of an existing key. Returns false if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> FatureResult<bool>;

    /// Reports the remaining lifetime of a key.
    async fn ttl(&self, key: &str) -> FatureResult<KeyTtl>;

    /// Round trip used by health checks.
    async fn ping(&self) -> FatureResult<()>;

    /// Removes every key of the partition.
    async fn flush(&self) -> FatureResult<()>;

    /// Usage counters of the underlying server.
    async fn info(&self) -> FatureResult<ServerInfo>;
}

/// Whole seconds for an expiry, never zero.
pub(crate) fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
