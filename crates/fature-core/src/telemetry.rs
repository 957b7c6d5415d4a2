//! Tracing subscriber setup.

#[cfg(feature = "telemetry")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::FatureResult;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one event per line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses `"json"` / `"pretty"`, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Builds the default filter directive for a log level. The level applies to
/// every target, the workspace crates included.
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    log_level.trim().to_string()
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level` when it is set.
#[cfg(feature = "telemetry")]
pub fn init_tracing(log_level: &str, format: LogFormat) -> FatureResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
    };

    result.map_err(|e| crate::FatureError::Internal(format!("Failed to install tracing subscriber: {e}")))?;

    tracing::info!(log_level = %log_level, format = ?format, "Tracing initialized");
    Ok(())
}

/// Placeholder for when the telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_tracing(_log_level: &str, _format: LogFormat) -> FatureResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("warn"), "warn");
        assert_eq!(default_directive(" info "), "info");
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn test_default_directive_caps_workspace_targets() {
        use tracing_subscriber::filter::LevelFilter;

        let filter = EnvFilter::new(default_directive("warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
