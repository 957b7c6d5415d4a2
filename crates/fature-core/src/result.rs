//! Result type aliases for Fature.

use crate::FatureError;

/// A specialized `Result` type for Fature operations.
pub type FatureResult<T> = Result<T, FatureError>;
