//! Common test infrastructure for Redis integration tests.

use fature_cache::CacheManager;
use fature_config::{CacheBackend, CacheConfig};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// Test Redis container wrapper.
///
/// Manages a Redis testcontainer lifecycle and provides a cache manager
/// over its logical databases.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    config: CacheConfig,
}

impl TestRedis {
    /// Starts a fresh Redis container.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = CacheConfig {
            backend: CacheBackend::Redis,
            host: "127.0.0.1".to_string(),
            port,
            pool_size: 4,
            ..CacheConfig::default()
        };

        Self {
            _container: container,
            config,
        }
    }

    /// Cache manager connected to the container.
    pub fn manager(&self) -> CacheManager {
        CacheManager::connect(&self.config).expect("Failed to build cache manager")
    }
}
