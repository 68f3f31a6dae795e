//! # JSON Module
//!
//! JSON parsing with simd-json and serialization with serde_json.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Parse JSON string to a typed value using simd-json
///
/// # Errors
///
/// Returns `Error::InvalidJson` if parsing fails
pub fn parse_json<T: DeserializeOwned>(json_str: &str) -> Result<T> {
    let mut bytes = json_str.as_bytes().to_vec();
    parse_json_bytes(&mut bytes)
}

/// Parse JSON bytes in place using simd-json
///
/// simd-json rewrites the buffer while parsing, hence `&mut`.
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &mut [u8]) -> Result<T> {
    simd_json::from_slice(bytes).map_err(|e| Error::InvalidJson {
        reason: e.to_string(),
    })
}

/// Read and parse a JSON file
///
/// # Errors
///
/// Returns `Error::Io` if the file can't be read, `Error::InvalidJson` if it
/// isn't valid JSON.
pub async fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let mut bytes = tokio::fs::read(path.as_ref()).await?;
    parse_json_bytes(&mut bytes)
}

/// Serialize a value to JSON string
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Serialize a value to a `serde_json::Value` tree
pub fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}
