//! Dashboard and monthly reports.

use super::{Cached, DomainStore};
use crate::codec::CacheValue;
use crate::keys;
use crate::partition::{CacheDatabase, Partitions};
use crate::ttl::CacheTtl;
use fature_core::FatureResult;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Accessor for the reports partition.
#[derive(Clone)]
pub struct ReportCache {
    store: DomainStore,
}

impl ReportCache {
    #[must_use]
    pub fn new(partitions: &Partitions) -> Self {
        Self {
            store: DomainStore::new(partitions, CacheDatabase::Reports),
        }
    }

    pub async fn get_dashboard(&self) -> FatureResult<Option<CacheValue>> {
        self.store.get(keys::DASHBOARD_MAIN).await
    }

    /// Stores the dashboard for 15 minutes.
    pub async fn set_dashboard<T>(&self, dashboard: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_dashboard_with_ttl(dashboard, CacheTtl::Short.duration())
            .await
    }

    pub async fn set_dashboard_with_ttl<T>(&self, dashboard: &T, ttl: Duration) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store.set(keys::DASHBOARD_MAIN, dashboard, ttl).await
    }

    pub async fn dashboard_or_load<T, F, Fut>(
        &self,
        loader: F,
    ) -> FatureResult<Cached<Option<CacheValue>>>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FatureResult<Option<T>>>,
    {
        self.store
            .get_or_load(keys::DASHBOARD_MAIN, CacheTtl::Short.duration(), loader)
            .await
    }

    pub async fn get_monthly_report(&self, year: i32, month: u32) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::report_monthly(year, month)).await
    }

    /// Stores a monthly report for 24 hours.
    pub async fn set_monthly_report<T>(&self, year: i32, month: u32, report: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_monthly_report_with_ttl(year, month, report, CacheTtl::VeryLong.duration())
            .await
    }

    pub async fn set_monthly_report_with_ttl<T>(
        &self,
        year: i32,
        month: u32,
        report: &T,
        ttl: Duration,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store
            .set(&keys::report_monthly(year, month), report, ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dashboard {
        total_affiliates: u64,
        total_volume: f64,
        top_performers: Vec<String>,
    }

    #[tokio::test]
    async fn test_dashboard_round_trip_through_serde() {
        let partitions = Partitions::in_memory();
        let cache = ReportCache::new(&partitions);
        let dashboard = Dashboard {
            total_affiliates: 120,
            total_volume: 98_500.75,
            top_performers: vec!["a-1".into(), "a-7".into()],
        };

        cache.set_dashboard(&dashboard).await.unwrap();

        let value = cache.get_dashboard().await.unwrap().unwrap();
        let decoded: Dashboard = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, dashboard);
    }

    #[tokio::test]
    async fn test_monthly_reports_are_keyed_by_period() {
        let partitions = Partitions::in_memory();
        let cache = ReportCache::new(&partitions);

        cache
            .set_monthly_report(2025, 5, &serde_json::json!({"month": 5}))
            .await
            .unwrap();

        assert!(cache.get_monthly_report(2025, 5).await.unwrap().is_some());
        assert_eq!(cache.get_monthly_report(2025, 6).await.unwrap(), None);
    }
}
