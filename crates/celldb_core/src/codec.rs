//! Typed interpretation of opaque cell values.
//!
//! The store itself is type-agnostic: cells hold bytes. Callers that
//! want typed attributes opt in through this module, which encodes
//! and decodes values as CBOR via serde. Anything written with
//! [`encode`] round-trips through [`decode`] on any platform.

use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`CoreError::Codec`] if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).map_err(|err| CoreError::Codec(err.to_string()))?;
    Ok(bytes)
}

/// Decodes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CoreError::Codec`] if the bytes are not valid CBOR for
/// the requested type.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    ciborium::de::from_reader(bytes).map_err(|err| CoreError::Codec(err.to_string()))
}

/// Decodes a cell value as an integer, for numeric filters.
///
/// Tries UTF-8 decimal text first, then CBOR (values written through
/// [`encode`]). Text goes first because ASCII digit strings are also
/// syntactically valid CBOR and would decode to the wrong number.
/// Returns `None` when the bytes decode as neither.
#[must_use]
pub fn decode_i64(bytes: &[u8]) -> Option<i64> {
    if let Some(n) = std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.trim().parse().ok())
    {
        return Some(n);
    }
    ciborium::de::from_reader::<i64, _>(bytes).ok()
}
