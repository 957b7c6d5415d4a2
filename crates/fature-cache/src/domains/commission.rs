//! Commission calculations and pending payouts.

use super::DomainStore;
use crate::codec::CacheValue;
use crate::keys;
use crate::partition::{CacheDatabase, Partitions};
use crate::ttl::CacheTtl;
use fature_core::FatureResult;
use serde::Serialize;
use std::time::Duration;

/// Accessor for the commissions partition.
#[derive(Clone)]
pub struct CommissionCache {
    store: DomainStore,
}

impl CommissionCache {
    #[must_use]
    pub fn new(partitions: &Partitions) -> Self {
        Self {
            store: DomainStore::new(partitions, CacheDatabase::Commissions),
        }
    }

    pub async fn get_calculation(&self, transaction_id: &str) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::commission_calc(transaction_id)).await
    }

    /// Stores a calculation for an hour.
    pub async fn set_calculation<T>(&self, transaction_id: &str, calculation: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_calculation_with_ttl(transaction_id, calculation, CacheTtl::Long.duration())
            .await
    }

    pub async fn set_calculation_with_ttl<T>(
        &self,
        transaction_id: &str,
        calculation: &T,
        ttl: Duration,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store
            .set(&keys::commission_calc(transaction_id), calculation, ttl)
            .await
    }

    pub async fn get_pending(&self, affiliate_id: &str) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::commission_pending(affiliate_id)).await
    }

    /// Stores pending commissions for 15 minutes.
    pub async fn set_pending<T>(&self, affiliate_id: &str, pending: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_pending_with_ttl(affiliate_id, pending, CacheTtl::Short.duration())
            .await
    }

    pub async fn set_pending_with_ttl<T>(
        &self,
        affiliate_id: &str,
        pending: &T,
        ttl: Duration,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store
            .set(&keys::commission_pending(affiliate_id), pending, ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyTtl;
    use serde_json::json;

    #[tokio::test]
    async fn test_default_ttls() {
        let partitions = Partitions::in_memory();
        let cache = CommissionCache::new(&partitions);

        cache.set_calculation("tx-1", &json!({"amount": 12.5})).await.unwrap();
        cache.set_pending("42", &json!([])).await.unwrap();

        let store = partitions.handle(CacheDatabase::Commissions);
        assert_eq!(
            store.ttl("commission:calc:tx-1").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(3600))
        );
        assert_eq!(
            store.ttl("commission:pending:42").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(900))
        );
        assert_eq!(cache.get_pending("42").await.unwrap(), Some(json!([])));
    }
}
