//! Per-domain cache accessors.
//!
//! Each accessor owns the key shapes and default TTLs of one domain and
//! talks to exactly one partition. The shared plumbing (codec, logging,
//! metrics) lives in [`DomainStore`].

mod affiliate;
mod commission;
mod ranking;
mod report;
mod session;

pub use affiliate::AffiliateStatsCache;
pub use commission::CommissionCache;
pub use ranking::RankingCache;
pub use report::ReportCache;
pub use session::SessionCache;

use crate::codec::{self, CacheValue};
use crate::metrics::CacheMetrics;
use crate::partition::{CacheDatabase, Partitions};
use crate::store::CacheStore;
use fature_core::FatureResult;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of a read-through lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cached<T> {
    /// The value, from the cache or from the loader.
    pub data: T,
    /// True only when the value came from the cache.
    pub cached: bool,
}

impl<T> Cached<T> {
    /// A value served from the cache.
    pub fn from_cache(data: T) -> Self {
        Self { data, cached: true }
    }

    /// A value produced by the loader.
    pub fn from_source(data: T) -> Self {
        Self {
            data,
            cached: false,
        }
    }
}

/// Partition handle plus the codec and instrumentation every accessor shares.
#[derive(Clone)]
pub(crate) struct DomainStore {
    database: CacheDatabase,
    store: Arc<dyn CacheStore>,
}

impl DomainStore {
    pub(crate) fn new(partitions: &Partitions, database: CacheDatabase) -> Self {
        Self {
            database,
            store: partitions.handle(database),
        }
    }

    pub(crate) const fn database(&self) -> CacheDatabase {
        self.database
    }

    pub(crate) fn raw(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    pub(crate) async fn get(&self, key: &str) -> FatureResult<Option<CacheValue>> {
        match self.store.get(key).await? {
            Some(text) => {
                debug!(partition = %self.database, key, "Cache hit");
                CacheMetrics::hit(self.database);
                Ok(Some(codec::decode(&text)))
            }
            None => {
                debug!(partition = %self.database, key, "Cache miss");
                CacheMetrics::miss(self.database);
                Ok(None)
            }
        }
    }

    pub(crate) async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        let text = codec::encode_serialize(value)?;
        self.store.set_ex(key, &text, ttl).await?;
        CacheMetrics::write(self.database);
        Ok(())
    }

    pub(crate) async fn delete(&self, keys: &[String]) -> FatureResult<u64> {
        self.store.delete(keys).await
    }

    pub(crate) async fn scan(&self, pattern: &str) -> FatureResult<Vec<String>> {
        self.store.scan_match(pattern).await
    }

    /// Serves `key` from the cache, or awaits `loader` and stores what it
    /// returns. A loader result of `None` is passed through and not cached.
    pub(crate) async fn get_or_load<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> FatureResult<Cached<Option<CacheValue>>>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FatureResult<Option<T>>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(Cached::from_cache(Some(value)));
        }

        let Some(loaded) = loader().await? else {
            return Ok(Cached::from_source(None));
        };

        let value = codec::to_value(&loaded)?;
        self.set(key, &value, ttl).await?;
        Ok(Cached::from_source(Some(value)))
    }
}
