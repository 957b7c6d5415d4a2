//! # Fature Cache
//!
//! Partitioned cache in front of the reporting database.
//!
//! Every functional domain (sessions, affiliate statistics, rankings,
//! commissions, reports) lives in its own Redis logical database, so a
//! flush or a health probe on one domain never touches another. Values are
//! stored as text: JSON for structured data, the bare string for scalars.
//!
//! ```text
//!   caller ──get──▶ accessor ──key──▶ partition ──▶ codec::decode ──▶ Some(value)
//!      │                                                          └─▶ None (miss)
//!      └─ on miss: load from the database, then accessor.set(..) with the domain TTL
//! ```
//!
//! The [`CacheManager`] owns one accessor per domain and adds the
//! maintenance operations: health check, flush and usage statistics.

pub mod codec;
pub mod domains;
pub mod keys;
pub mod manager;
pub mod metrics;
pub mod partition;
pub mod store;
pub mod ttl;

pub use codec::CacheValue;
pub use domains::{
    AffiliateStatsCache, Cached, CommissionCache, RankingCache, ReportCache, SessionCache,
};
pub use manager::{CacheManager, PartitionStats};
pub use partition::{CacheDatabase, Partitions};
pub use store::{CacheStore, KeyTtl, MemoryCacheStore, RedisCacheStore, ServerInfo};
pub use ttl::CacheTtl;
