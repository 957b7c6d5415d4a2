//! # Fature Cache Server
//!
//! Builds the partitioned cache from configuration and keeps watch over it:
//! an initial health report at startup, then a probe of every partition on
//! each health-check interval until shutdown.

use fature_cache::metrics::register_metrics;
use fature_cache::{CacheDatabase, CacheManager};
use fature_config::{AppConfig, ConfigLoader};
use fature_core::telemetry::{init_tracing, LogFormat};
use fature_core::{FatureError, FatureResult};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("fature-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> FatureResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    let format = LogFormat::parse(&config.observability.log_format).unwrap_or_default();
    init_tracing(&config.observability.log_level, format)?;

    info!("Starting Fature cache server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);
    info!("Cache backend: {}", config.cache.backend);

    if config.observability.metrics_enabled {
        init_metrics(&config)?;
    }

    let manager = CacheManager::connect(&config.cache)?;
    report_health(&manager.health_check().await);

    monitor(&manager, &config).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Installs the Prometheus exporter and registers metric descriptions.
fn init_metrics(config: &AppConfig) -> FatureResult<()> {
    let addr: SocketAddr = config.observability.metrics_addr.parse().map_err(|e| {
        FatureError::Configuration(format!(
            "Invalid metrics address '{}': {}",
            config.observability.metrics_addr, e
        ))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| FatureError::Internal(format!("Failed to install Prometheus exporter: {}", e)))?;

    register_metrics();
    info!("Prometheus metrics available on http://{}/metrics", addr);
    Ok(())
}

/// Probes every partition on each health-check interval until a shutdown
/// signal arrives.
async fn monitor(manager: &CacheManager, config: &AppConfig) {
    let mut interval = tokio::time::interval(config.cache.health_check_interval());
    // The first tick completes immediately; the startup report covers it.
    interval.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => report_health(&manager.health_check().await),
            () = &mut shutdown => break,
        }
    }
}

fn report_health(health: &BTreeMap<CacheDatabase, bool>) {
    let down: Vec<&str> = health
        .iter()
        .filter(|(_, up)| !**up)
        .map(|(database, _)| database.as_str())
        .collect();

    if down.is_empty() {
        info!(partitions = health.len(), "All cache partitions healthy");
    } else {
        warn!(down = ?down, "Cache partitions unavailable");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
