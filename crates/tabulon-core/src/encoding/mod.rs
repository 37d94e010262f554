//! Canonical text encoding of primary keys and indexed values.
//!
//! Record stores and hash index stores are keyed by strings. A value is
//! encoded as compact JSON after number canonicalization, so values that
//! compare equal under the query engine's ordering share one encoding.

pub mod number;

use serde_json::Value;

use crate::error::EncodingError;

use number::canonical_number;

/// Rewrite every number inside `value` into canonical form.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(canonical_number(n)),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Encode any value as an index bucket key.
pub fn encode_value(value: &Value) -> Result<String, EncodingError> {
    Ok(serde_json::to_string(&canonicalize(value))?)
}

/// Encode a primary key value. Only strings, numbers and booleans are keys.
pub fn encode_key(value: &Value) -> Result<String, EncodingError> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => encode_value(value),
        Value::Null => Err(EncodingError::UnsupportedKey { kind: "null" }),
        Value::Array(_) => Err(EncodingError::UnsupportedKey { kind: "array" }),
        Value::Object(_) => Err(EncodingError::UnsupportedKey { kind: "object" }),
    }
}

/// Decode a key produced by [`encode_key`].
pub fn decode_key(encoded: &str) -> Result<Value, EncodingError> {
    Ok(serde_json::from_str(encoded)?)
}
