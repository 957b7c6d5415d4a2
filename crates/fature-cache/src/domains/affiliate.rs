//! Affiliate statistics, referral hierarchy and monthly breakdowns.

use super::{Cached, DomainStore};
use crate::codec::CacheValue;
use crate::keys;
use crate::metrics::CacheMetrics;
use crate::partition::{CacheDatabase, Partitions};
use crate::ttl::CacheTtl;
use fature_core::FatureResult;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Accessor for the affiliate statistics partition.
#[derive(Clone)]
pub struct AffiliateStatsCache {
    store: DomainStore,
}

impl AffiliateStatsCache {
    #[must_use]
    pub fn new(partitions: &Partitions) -> Self {
        Self {
            store: DomainStore::new(partitions, CacheDatabase::AffiliateStats),
        }
    }

    pub async fn get_stats(&self, affiliate_id: &str) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::affiliate_stats(affiliate_id)).await
    }

    /// Stores aggregate statistics for 30 minutes.
    pub async fn set_stats<T>(&self, affiliate_id: &str, stats: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_stats_with_ttl(affiliate_id, stats, CacheTtl::Medium.duration())
            .await
    }

    pub async fn set_stats_with_ttl<T>(
        &self,
        affiliate_id: &str,
        stats: &T,
        ttl: Duration,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store
            .set(&keys::affiliate_stats(affiliate_id), stats, ttl)
            .await
    }

    /// Serves the statistics from the cache, loading and caching them on a
    /// miss.
    pub async fn stats_or_load<T, F, Fut>(
        &self,
        affiliate_id: &str,
        loader: F,
    ) -> FatureResult<Cached<Option<CacheValue>>>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FatureResult<Option<T>>>,
    {
        self.store
            .get_or_load(
                &keys::affiliate_stats(affiliate_id),
                CacheTtl::Medium.duration(),
                loader,
            )
            .await
    }

    pub async fn get_hierarchy(&self, affiliate_id: &str) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::affiliate_hierarchy(affiliate_id)).await
    }

    /// Stores the referral hierarchy for 24 hours.
    pub async fn set_hierarchy<T>(&self, affiliate_id: &str, hierarchy: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_hierarchy_with_ttl(affiliate_id, hierarchy, CacheTtl::VeryLong.duration())
            .await
    }

    pub async fn set_hierarchy_with_ttl<T>(
        &self,
        affiliate_id: &str,
        hierarchy: &T,
        ttl: Duration,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store
            .set(&keys::affiliate_hierarchy(affiliate_id), hierarchy, ttl)
            .await
    }

    pub async fn get_monthly_stats(
        &self,
        affiliate_id: &str,
        year: i32,
        month: u32,
    ) -> FatureResult<Option<CacheValue>> {
        self.store
            .get(&keys::affiliate_monthly(affiliate_id, year, month))
            .await
    }

    /// Stores one month of statistics for an hour.
    pub async fn set_monthly_stats<T>(
        &self,
        affiliate_id: &str,
        year: i32,
        month: u32,
        stats: &T,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_monthly_stats_with_ttl(affiliate_id, year, month, stats, CacheTtl::Long.duration())
            .await
    }

    pub async fn set_monthly_stats_with_ttl<T>(
        &self,
        affiliate_id: &str,
        year: i32,
        month: u32,
        stats: &T,
        ttl: Duration,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store
            .set(&keys::affiliate_monthly(affiliate_id, year, month), stats, ttl)
            .await
    }

    /// Drops everything cached for one affiliate: statistics, hierarchy and
    /// every monthly breakdown. Returns the number of keys removed.
    ///
    /// The exact keys go first, then the monthly keys found by a pattern
    /// scan. The two steps are not atomic; a monthly entry written between
    /// them survives.
    pub async fn invalidate(&self, affiliate_id: &str) -> FatureResult<u64> {
        let exact = [
            keys::affiliate_stats(affiliate_id),
            keys::affiliate_hierarchy(affiliate_id),
        ];
        let mut removed = self.store.delete(&exact).await?;

        let monthly = self
            .store
            .scan(&keys::affiliate_monthly_pattern(affiliate_id))
            .await?;
        if !monthly.is_empty() {
            removed += self.store.delete(&monthly).await?;
        }

        info!(
            partition = %self.store.database(),
            affiliate_id,
            removed,
            "Invalidated affiliate cache"
        );
        CacheMetrics::invalidated(self.store.database(), removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_invalidate_is_scoped_to_one_affiliate() {
        let partitions = Partitions::in_memory();
        let cache = AffiliateStatsCache::new(&partitions);

        for id in ["42", "420"] {
            cache.set_stats(id, &json!({"total_referrals": 25})).await.unwrap();
            cache.set_hierarchy(id, &json!([{"id": "child"}])).await.unwrap();
            cache.set_monthly_stats(id, 2025, 5, &json!({"volume": 1})).await.unwrap();
            cache.set_monthly_stats(id, 2025, 6, &json!({"volume": 2})).await.unwrap();
        }

        assert_eq!(cache.invalidate("42").await.unwrap(), 4);

        assert_eq!(cache.get_stats("42").await.unwrap(), None);
        assert_eq!(cache.get_hierarchy("42").await.unwrap(), None);
        assert_eq!(cache.get_monthly_stats("42", 2025, 6).await.unwrap(), None);

        assert!(cache.get_stats("420").await.unwrap().is_some());
        assert!(cache.get_monthly_stats("420", 2025, 5).await.unwrap().is_some());

        assert_eq!(cache.invalidate("42").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_treats_glob_characters_literally() {
        let partitions = Partitions::in_memory();
        let cache = AffiliateStatsCache::new(&partitions);

        cache.set_monthly_stats("a*", 2025, 1, &json!(1)).await.unwrap();
        cache.set_monthly_stats("ab", 2025, 1, &json!(2)).await.unwrap();

        assert_eq!(cache.invalidate("a*").await.unwrap(), 1);
        assert_eq!(cache.get_monthly_stats("ab", 2025, 1).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_stats_or_load() {
        let partitions = Partitions::in_memory();
        let cache = AffiliateStatsCache::new(&partitions);
        let stats = json!({"total_volume": 10000.5, "total_commissions": 500});

        let source = stats.clone();
        let first = cache
            .stats_or_load("7", move || async move { Ok(Some(source)) })
            .await
            .unwrap();
        assert!(!first.cached);

        let second = cache
            .stats_or_load("7", || async { Ok(None::<CacheValue>) })
            .await
            .unwrap();
        assert!(second.cached);
        assert_eq!(second.data, Some(stats));
    }
}
