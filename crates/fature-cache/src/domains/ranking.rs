//! Active rankings, ranking participants and daily activity sequences.

use super::{Cached, DomainStore};
use crate::codec::CacheValue;
use crate::keys;
use crate::partition::{CacheDatabase, Partitions};
use crate::ttl::{until_next_midnight, CacheTtl};
use chrono::{DateTime, Local, TimeZone};
use fature_core::FatureResult;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Accessor for the rankings partition.
#[derive(Clone)]
pub struct RankingCache {
    store: DomainStore,
}

impl RankingCache {
    #[must_use]
    pub fn new(partitions: &Partitions) -> Self {
        Self {
            store: DomainStore::new(partitions, CacheDatabase::Rankings),
        }
    }

    pub async fn get_active_rankings(&self) -> FatureResult<Option<CacheValue>> {
        self.store.get(keys::RANKING_ACTIVE).await
    }

    /// Stores the active rankings for 15 minutes.
    pub async fn set_active_rankings<T>(&self, rankings: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_active_rankings_with_ttl(rankings, CacheTtl::Short.duration())
            .await
    }

    pub async fn set_active_rankings_with_ttl<T>(&self, rankings: &T, ttl: Duration) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store.set(keys::RANKING_ACTIVE, rankings, ttl).await
    }

    pub async fn active_rankings_or_load<T, F, Fut>(
        &self,
        loader: F,
    ) -> FatureResult<Cached<Option<CacheValue>>>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FatureResult<Option<T>>>,
    {
        self.store
            .get_or_load(keys::RANKING_ACTIVE, CacheTtl::Short.duration(), loader)
            .await
    }

    pub async fn get_participants(&self, ranking_id: &str) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::ranking_participants(ranking_id)).await
    }

    /// Stores the participants of a ranking for 15 minutes.
    pub async fn set_participants<T>(&self, ranking_id: &str, participants: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_participants_with_ttl(ranking_id, participants, CacheTtl::Short.duration())
            .await
    }

    pub async fn set_participants_with_ttl<T>(
        &self,
        ranking_id: &str,
        participants: &T,
        ttl: Duration,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.store
            .set(&keys::ranking_participants(ranking_id), participants, ttl)
            .await
    }

    pub async fn get_daily_sequence(&self, user_id: &str) -> FatureResult<Option<CacheValue>> {
        self.store.get(&keys::daily_sequence(user_id)).await
    }

    /// Stores a user's daily sequence until the next local midnight.
    pub async fn set_daily_sequence<T>(&self, user_id: &str, sequence: &T) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_daily_sequence_at(user_id, sequence, &Local::now())
            .await
    }

    /// Stores a user's daily sequence until the midnight following `now`, in
    /// `now`'s time zone.
    pub async fn set_daily_sequence_at<T, Tz>(
        &self,
        user_id: &str,
        sequence: &T,
        now: &DateTime<Tz>,
    ) -> FatureResult<()>
    where
        T: Serialize + ?Sized,
        Tz: TimeZone,
    {
        let ttl = until_next_midnight(now);
        self.store
            .set(&keys::daily_sequence(user_id), sequence, ttl)
            .await
    }
}
