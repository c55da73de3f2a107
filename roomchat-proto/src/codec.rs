//! JSON codec for channel frames.
//!
//! The channel speaks one JSON document per WebSocket text frame, so no
//! extra framing layer is needed — the codec is a thin error-typed wrapper
//! around `serde_json`.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors that can occur during encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to serialize a value to JSON.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Failed to deserialize a value from JSON.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode a value as a JSON string.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Encode)
}

/// Decode a value from a JSON string.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the input is not valid JSON or does
/// not match the expected shape.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}
