//! Cache manager: one accessor per domain plus maintenance operations.

use crate::domains::{AffiliateStatsCache, CommissionCache, RankingCache, ReportCache, SessionCache};
use crate::metrics::CacheMetrics;
use crate::partition::{CacheDatabase, Partitions};
use fature_config::CacheConfig;
use fature_core::FatureResult;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Usage counters of one partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartitionStats {
    /// Human readable memory usage, if reported.
    pub memory_used: Option<String>,
    pub connected_clients: Option<u64>,
    pub commands_processed: Option<u64>,
    pub hits: u64,
    pub misses: u64,
    /// Hits as a percentage of all lookups; 0 when there were none.
    pub hit_rate: f64,
}

impl PartitionStats {
    /// Hit percentage, 0 without traffic.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits.saturating_add(misses).max(1);
        hits as f64 / total as f64 * 100.0
    }
}

/// Entry point of the cache layer.
///
/// Cloning is cheap: every clone shares the same partitions.
#[derive(Clone)]
pub struct CacheManager {
    partitions: Arc<Partitions>,
    affiliate_stats: AffiliateStatsCache,
    commissions: CommissionCache,
    rankings: RankingCache,
    sessions: SessionCache,
    reports: ReportCache,
}

impl CacheManager {
    #[must_use]
    pub fn new(partitions: Partitions) -> Self {
        Self {
            affiliate_stats: AffiliateStatsCache::new(&partitions),
            commissions: CommissionCache::new(&partitions),
            rankings: RankingCache::new(&partitions),
            sessions: SessionCache::new(&partitions),
            reports: ReportCache::new(&partitions),
            partitions: Arc::new(partitions),
        }
    }

    /// Builds the manager for the configured backend.
    pub fn connect(config: &CacheConfig) -> FatureResult<Self> {
        Partitions::connect(config).map(Self::new)
    }

    /// Manager over in-process stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Partitions::in_memory())
    }

    #[must_use]
    pub fn affiliate_stats(&self) -> &AffiliateStatsCache {
        &self.affiliate_stats
    }

    #[must_use]
    pub fn commissions(&self) -> &CommissionCache {
        &self.commissions
    }

    #[must_use]
    pub fn rankings(&self) -> &RankingCache {
        &self.rankings
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    #[must_use]
    pub fn reports(&self) -> &ReportCache {
        &self.reports
    }

    #[must_use]
    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    /// Pings every partition concurrently. A failing partition is reported
    /// as `false` and never affects the others.
    pub async fn health_check(&self) -> BTreeMap<CacheDatabase, bool> {
        let probes = self.partitions.iter().map(|(database, store)| async move {
            let up = match store.ping().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(partition = %database, error = %e, "Cache health check failed");
                    false
                }
            };
            CacheMetrics::partition_up(database, up);
            (database, up)
        });

        join_all(probes).await.into_iter().collect()
    }

    /// Flushes every partition in index order, stopping at the first
    /// failure. Partitions before the failing one stay flushed.
    pub async fn clear_all(&self) -> FatureResult<()> {
        for (database, store) in self.partitions.iter() {
            if let Err(e) = store.flush().await {
                warn!(partition = %database, error = %e, "Failed to flush partition");
                return Err(e);
            }
        }
        info!("Cleared all cache partitions");
        Ok(())
    }

    /// Flushes a single partition.
    pub async fn clear(&self, database: CacheDatabase) -> FatureResult<()> {
        self.partitions.handle(database).flush().await
    }

    /// Usage counters per partition.
    pub async fn cache_stats(&self) -> FatureResult<BTreeMap<CacheDatabase, PartitionStats>> {
        let mut stats = BTreeMap::new();
        for (database, store) in self.partitions.iter() {
            let info = store.info().await?;
            stats.insert(
                database,
                PartitionStats {
                    memory_used: info.used_memory_human,
                    connected_clients: info.connected_clients,
                    commands_processed: info.total_commands_processed,
                    hits: info.keyspace_hits,
                    misses: info.keyspace_misses,
                    hit_rate: PartitionStats::hit_rate(info.keyspace_hits, info.keyspace_misses),
                },
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CacheStore, MockCacheStore, ServerInfo};
    use fature_core::FatureError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn healthy() -> MockCacheStore {
        let mut store = MockCacheStore::new();
        store.expect_ping().returning(|| Ok(()));
        store.expect_flush().returning(|| Ok(()));
        store
    }

    #[test]
    fn test_hit_rate() {
        assert!((PartitionStats::hit_rate(0, 0) - 0.0).abs() < f64::EPSILON);
        assert!((PartitionStats::hit_rate(3, 1) - 75.0).abs() < f64::EPSILON);
        assert!((PartitionStats::hit_rate(5, 0) - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_one_unreachable_partition_is_isolated() {
        let partitions = Partitions::from_fn(|database| {
            let store: Arc<dyn CacheStore> = if database == CacheDatabase::Rankings {
                let mut store = MockCacheStore::new();
                store
                    .expect_ping()
                    .returning(|| Err(FatureError::connection("connection refused")));
                Arc::new(store)
            } else {
                Arc::new(healthy())
            };
            store
        });

        let health = CacheManager::new(partitions).health_check().await;

        assert_eq!(health.len(), 6);
        assert_eq!(health.values().filter(|up| !**up).count(), 1);
        assert_eq!(health.get(&CacheDatabase::Rankings), Some(&false));
        assert_eq!(health.get(&CacheDatabase::General), Some(&true));
    }

    #[tokio::test]
    async fn test_clear_all_stops_at_first_failure() {
        let flushed = Arc::new(AtomicUsize::new(0));
        let partitions = Partitions::from_fn(|database| {
            let mut store = MockCacheStore::new();
            if database == CacheDatabase::AffiliateStats {
                store
                    .expect_flush()
                    .returning(|| Err(FatureError::connection("connection reset")));
            } else {
                let flushed = Arc::clone(&flushed);
                store.expect_flush().returning(move || {
                    flushed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
            }
            Arc::new(store) as Arc<dyn CacheStore>
        });

        let result = CacheManager::new(partitions).clear_all().await;

        assert!(result.unwrap_err().is_connectivity());
        // General and sessions were flushed before the failure.
        assert_eq!(flushed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_stats_without_traffic() {
        let partitions = Partitions::from_fn(|_| {
            let mut store = MockCacheStore::new();
            store.expect_info().returning(|| {
                Ok(ServerInfo {
                    used_memory_human: Some("1.05M".to_string()),
                    connected_clients: Some(3),
                    total_commands_processed: Some(10),
                    keyspace_hits: 0,
                    keyspace_misses: 0,
                })
            });
            Arc::new(store) as Arc<dyn CacheStore>
        });

        let stats = CacheManager::new(partitions).cache_stats().await.unwrap();

        assert_eq!(stats.len(), 6);
        let general = &stats[&CacheDatabase::General];
        assert_eq!(general.memory_used.as_deref(), Some("1.05M"));
        assert_eq!(general.connected_clients, Some(3));
        assert!(general.hit_rate.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_clear_single_partition() {
        let manager = CacheManager::in_memory();
        manager.reports().set_dashboard(&serde_json::json!({"x": 1})).await.unwrap();
        manager.sessions().set_session("t", &serde_json::json!({"u": 1})).await.unwrap();

        manager.clear(CacheDatabase::Reports).await.unwrap();

        assert_eq!(manager.reports().get_dashboard().await.unwrap(), None);
        assert!(manager.sessions().get_session("t").await.unwrap().is_some());
    }
}
