//! Prometheus metrics for cache traffic and partition health.
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op.

use crate::partition::CacheDatabase;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names for the cache.
pub mod names {
    /// Reads that found an entry.
    pub const HITS_TOTAL: &str = "fature_cache_hits_total";
    /// Reads that found nothing.
    pub const MISSES_TOTAL: &str = "fature_cache_misses_total";
    /// Entries written.
    pub const WRITES_TOTAL: &str = "fature_cache_writes_total";
    /// Keys removed by invalidation.
    pub const INVALIDATED_KEYS_TOTAL: &str = "fature_cache_invalidated_keys_total";
    /// 1 when the last health probe of a partition succeeded.
    pub const PARTITION_UP: &str = "fature_cache_partition_up";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::HITS_TOTAL, "Total number of cache reads that found an entry");
    describe_counter!(names::MISSES_TOTAL, "Total number of cache reads that found nothing");
    describe_counter!(names::WRITES_TOTAL, "Total number of cache entries written");
    describe_counter!(
        names::INVALIDATED_KEYS_TOTAL,
        "Total number of keys removed by invalidation"
    );
    describe_gauge!(
        names::PARTITION_UP,
        "Whether the last health probe of a partition succeeded (1) or failed (0)"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache hit.
    pub fn hit(database: CacheDatabase) {
        counter!(names::HITS_TOTAL, "partition" => database.as_str()).increment(1);
    }

    /// Record a cache miss.
    pub fn miss(database: CacheDatabase) {
        counter!(names::MISSES_TOTAL, "partition" => database.as_str()).increment(1);
    }

    /// Record an entry written.
    pub fn write(database: CacheDatabase) {
        counter!(names::WRITES_TOTAL, "partition" => database.as_str()).increment(1);
    }

    /// Record keys removed by invalidation.
    pub fn invalidated(database: CacheDatabase, keys: u64) {
        counter!(names::INVALIDATED_KEYS_TOTAL, "partition" => database.as_str()).increment(keys);
    }

    /// Record the outcome of a health probe.
    pub fn partition_up(database: CacheDatabase, up: bool) {
        gauge!(names::PARTITION_UP, "partition" => database.as_str()).set(if up { 1.0 } else { 0.0 });
    }
}
