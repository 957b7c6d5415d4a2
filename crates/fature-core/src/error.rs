//! Unified error types for the cache layer and its callers.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Fature.
///
/// Connectivity problems ([`FatureError::Connection`] and
/// [`FatureError::Timeout`]) are the only failures a healthy deployment is
/// expected to see at runtime. They are surfaced to callers unchanged so the
/// API layer can map them to a "service unavailable" response.
#[derive(Error, Debug)]
pub enum FatureError {
    // ============ Transport Errors ============
    /// The cache server could not be reached, refused the connection,
    /// rejected authentication or the pool could not hand out a connection.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// A cache command or connection attempt exceeded its timeout.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The cache server answered with an error (e.g. a wrong-type command).
    #[error("Cache error: {0}")]
    Cache(String),

    // ============ Data Errors ============
    /// A value could not be converted to its wire form.
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Setup Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FatureError {
    /// Returns the HTTP status code an API layer should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Connection(_) | Self::Timeout(_) => 503,
            Self::Cache(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CACHE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection<T: Into<String>>(message: T) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a cache command error.
    #[must_use]
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for transport failures: the store was unreachable or
    /// too slow, as opposed to rejecting a command.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Checks if the failed operation may succeed when retried by the caller.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        self.is_connectivity()
    }
}

impl From<serde_json::Error> for FatureError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request trace ID for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response from a `FatureError`.
    #[must_use]
    pub fn from_error(error: &FatureError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            trace_id: None,
        }
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<&FatureError> for ErrorResponse {
    fn from(error: &FatureError) -> Self {
        Self::from_error(error)
    }
}
