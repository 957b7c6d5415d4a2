//! Key-space partitioning.
//!
//! Each cache domain is bound to its own Redis logical database. Two
//! domains may use textually identical keys without colliding because the
//! database index, not the key, selects the storage location.

use crate::store::{CacheStore, MemoryCacheStore, RedisCacheStore};
use fature_config::{CacheBackend, CacheConfig};
use fature_core::FatureResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Logical database assigned to each cache domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheDatabase {
    /// General purpose cache.
    General,
    /// User sessions.
    Sessions,
    /// Affiliate statistics.
    AffiliateStats,
    /// Rankings and gamification.
    Rankings,
    /// Commission calculations.
    Commissions,
    /// Reports and dashboards.
    Reports,
}

impl CacheDatabase {
    /// Every partition, in database index order.
    pub const ALL: [Self; 6] = [
        Self::General,
        Self::Sessions,
        Self::AffiliateStats,
        Self::Rankings,
        Self::Commissions,
        Self::Reports,
    ];

    /// Redis logical database index.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::General => 0,
            Self::Sessions => 1,
            Self::AffiliateStats => 2,
            Self::Rankings => 3,
            Self::Commissions => 4,
            Self::Reports => 5,
        }
    }

    /// Stable name used in logs, metric labels and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Sessions => "SESSIONS",
            Self::AffiliateStats => "AFFILIATE_STATS",
            Self::Rankings => "RANKINGS",
            Self::Commissions => "COMMISSIONS",
            Self::Reports => "REPORTS",
        }
    }
}

impl fmt::Display for CacheDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One long-lived store handle per partition, shared by every caller.
pub struct Partitions {
    stores: Vec<Arc<dyn CacheStore>>,
}

impl Partitions {
    /// Creates the handles for the configured backend.
    ///
    /// Redis pools are created here, eagerly, but connections are opened on
    /// first use: an unreachable server shows up in the first command or
    /// health check, not at construction.
    pub fn connect(config: &CacheConfig) -> FatureResult<Self> {
        let partitions = match config.backend {
            CacheBackend::Redis => Self::redis(config)?,
            CacheBackend::Memory => Self::in_memory(),
        };
        info!(backend = %config.backend, partitions = CacheDatabase::ALL.len(), "Cache partitions ready");
        Ok(partitions)
    }

    /// One Redis pool per logical database.
    pub fn redis(config: &CacheConfig) -> FatureResult<Self> {
        let stores = CacheDatabase::ALL
            .iter()
            .map(|&database| {
                RedisCacheStore::connect(config, database)
                    .map(|store| Arc::new(store) as Arc<dyn CacheStore>)
            })
            .collect::<FatureResult<Vec<_>>>()?;
        Ok(Self { stores })
    }

    /// One in-process store per partition.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_fn(|_| Arc::new(MemoryCacheStore::new()))
    }

    /// Builds partitions from a store factory, called once per database in
    /// index order.
    pub fn from_fn<F>(mut factory: F) -> Self
    where
        F: FnMut(CacheDatabase) -> Arc<dyn CacheStore>,
    {
        Self {
            stores: CacheDatabase::ALL.iter().map(|&db| factory(db)).collect(),
        }
    }

    /// Returns the store bound to `database`.
    #[must_use]
    pub fn handle(&self, database: CacheDatabase) -> Arc<dyn CacheStore> {
        Arc::clone(&self.stores[usize::from(database.index())])
    }

    /// Iterates over every partition in index order.
    pub fn iter(&self) -> impl Iterator<Item = (CacheDatabase, &Arc<dyn CacheStore>)> {
        CacheDatabase::ALL.iter().copied().zip(self.stores.iter())
    }
}

impl fmt::Debug for Partitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partitions")
            .field("count", &self.stores.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_indices_are_distinct_and_ordered() {
        for (position, database) in CacheDatabase::ALL.iter().enumerate() {
            assert_eq!(usize::from(database.index()), position);
        }
        assert_eq!(CacheDatabase::AffiliateStats.to_string(), "AFFILIATE_STATS");
    }

    #[test]
    fn test_serializes_as_name() {
        let json = serde_json::to_string(&CacheDatabase::Rankings).unwrap();
        assert_eq!(json, "\"RANKINGS\"");
    }

    #[tokio::test]
    async fn test_identical_keys_do_not_collide_across_partitions() {
        let partitions = Partitions::in_memory();
        let sessions = partitions.handle(CacheDatabase::Sessions);
        let reports = partitions.handle(CacheDatabase::Reports);

        sessions.set_ex("shared", "from-sessions", Duration::from_secs(60)).await.unwrap();
        reports.set_ex("shared", "from-reports", Duration::from_secs(60)).await.unwrap();

        assert_eq!(sessions.get("shared").await.unwrap().as_deref(), Some("from-sessions"));
        assert_eq!(reports.get("shared").await.unwrap().as_deref(), Some("from-reports"));

        reports.flush().await.unwrap();
        assert_eq!(sessions.get("shared").await.unwrap().as_deref(), Some("from-sessions"));
        assert_eq!(reports.get("shared").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redis_partitions_are_created_without_a_server() {
        let config = CacheConfig {
            port: 1,
            ..CacheConfig::default()
        };
        let partitions = Partitions::redis(&config).unwrap();
        assert_eq!(partitions.iter().count(), 6);
    }
}
