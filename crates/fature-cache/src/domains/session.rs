//! User sessions and the per-user set of active session tokens.

use super::DomainStore;
use crate::codec::CacheValue;
use crate::keys;
use crate::metrics::CacheMetrics;
use crate::partition::{CacheDatabase, Partitions};
use crate::ttl::CacheTtl;
use fature_core::FatureResult;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Accessor for the sessions partition.
#[derive(Clone)]
pub struct SessionCache {
    store: DomainStore,
}

impl SessionCache {
    #[must_use]
    pub fn new(partitions: &Partitions) -> Self {
        Self {
            store: DomainStore::new(partitions, CacheDatabase::Sessions),
        }
    }

    pub async fn get_session(&self, token: &str) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::session(token)).await
    }

    /// Stores session data for 24 hours.
    pub async fn set_session<T>(&self, token: &str, data: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_session_with_ttl(token, data, CacheTtl::Session.duration())
            .await
    }

    pub async fn set_session_with_ttl<T>(&self, token: &str, data: &T, ttl: Duration) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store.set(&keys::session(token), data, ttl).await
    }

    /// Removes a session payload. Returns true if it existed.
    pub async fn delete_session(&self, token: &str) -> FatureResult<bool> {
        let removed = self.store.delete(&[keys::session(token)]).await?;
        Ok(removed > 0)
    }

    /// Tokens currently recorded for a user, in no particular order.
    pub async fn active_sessions(&self, user_id: &str) -> FatureResult<Vec<String>> {
        self.store.raw().set_members(&keys::user_sessions(user_id)).await
    }

    /// Records `token` for the user and restarts the set's 24 hour expiry.
    ///
    /// Both happen in one atomic step, so a failed call never leaves the set
    /// without an expiry.
    pub async fn add_user_session(&self, user_id: &str, token: &str) -> FatureResult<()> {
        let key = keys::user_sessions(user_id);
        self.store
            .raw()
            .set_add_expire(&key, token, CacheTtl::Session.duration())
            .await?;

        debug!(partition = %self.store.database(), key = %key, "Recorded user session");
        CacheMetrics::write(self.store.database());
        Ok(())
    }

    /// Forgets `token` for the user. The set's expiry is left as it was.
    pub async fn remove_user_session(&self, user_id: &str, token: &str) -> FatureResult<bool> {
        self.store
            .raw()
            .set_remove(&keys::user_sessions(user_id), token)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyTtl;
    use serde_json::json;

    #[tokio::test]
    async fn test_session_payloads() {
        let partitions = Partitions::in_memory();
        let cache = SessionCache::new(&partitions);

        cache
            .set_session("tok", &json!({"user_id": "u1", "role": "affiliate"}))
            .await
            .unwrap();
        assert_eq!(
            cache.get_session("tok").await.unwrap(),
            Some(json!({"user_id": "u1", "role": "affiliate"}))
        );

        assert!(cache.delete_session("tok").await.unwrap());
        assert!(!cache.delete_session("tok").await.unwrap());
        assert_eq!(cache.get_session("tok").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_leaves_set_expiry_alone() {
        let partitions = Partitions::in_memory();
        let cache = SessionCache::new(&partitions);
        let store = partitions.handle(CacheDatabase::Sessions);

        cache.add_user_session("u1", "t1").await.unwrap();
        cache.add_user_session("u1", "t2").await.unwrap();
        tokio::time::advance(Duration::from_secs(100)).await;

        assert!(cache.remove_user_session("u1", "t1").await.unwrap());
        assert_eq!(
            store.ttl("user:sessions:u1").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(86_400 - 100))
        );
        assert_eq!(cache.active_sessions("u1").await.unwrap(), vec!["t2"]);

        // A later add restarts the full expiry.
        cache.add_user_session("u1", "t3").await.unwrap();
        assert_eq!(
            store.ttl("user:sessions:u1").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(86_400))
        );
    }

    #[tokio::test]
    async fn test_add_user_session_is_a_single_atomic_call() {
        use crate::store::{CacheStore, MockCacheStore};
        use fature_core::FatureError;
        use std::sync::Arc;

        let mut store = MockCacheStore::new();
        store.expect_set_add().never();
        store.expect_expire().never();
        store
            .expect_set_add_expire()
            .withf(|key, member, ttl| {
                key == "user:sessions:u1" && member == "t1" && *ttl == Duration::from_secs(86_400)
            })
            .times(1)
            .returning(|_, _, _| Err(FatureError::connection("connection reset")));

        let store: Arc<dyn CacheStore> = Arc::new(store);
        let partitions = Partitions::from_fn(|_| Arc::clone(&store));
        let cache = SessionCache::new(&partitions);

        let err = cache.add_user_session("u1", "t1").await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_active_sessions_of_unknown_user() {
        let partitions = Partitions::in_memory();
        let cache = SessionCache::new(&partitions);
        assert!(cache.active_sessions("nobody").await.unwrap().is_empty());
        assert!(!cache.remove_user_session("nobody", "t").await.unwrap());
    }
}
