//! Wire form of cached values.
//!
//! Objects and arrays are stored as compact JSON. Strings are stored bare,
//! without quotes, and every other scalar as its JSON text. Decoding parses
//! JSON and falls back to the raw text, so entries written by older clients
//! as plain strings still read back as string values.

use fature_core::FatureResult;
use serde::Serialize;
use serde_json::Value;

/// Decoded form of every cache entry.
pub type CacheValue = Value;

/// Encodes a value to its stored text.
#[must_use]
pub fn encode(value: &CacheValue) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Converts any serializable value to a [`CacheValue`].
///
/// Date/time fields go through their serde form (RFC 3339 text for chrono)
/// and therefore come back as strings.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> FatureResult<CacheValue> {
    Ok(serde_json::to_value(value)?)
}

/// Encodes any serializable value to its stored text.
pub fn encode_serialize<T: Serialize + ?Sized>(value: &T) -> FatureResult<String> {
    to_value(value).map(|v| encode(&v))
}

/// Decodes stored text. Never fails: text that is not JSON is returned as a
/// string value unchanged.
#[must_use]
pub fn decode(text: &str) -> CacheValue {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}
