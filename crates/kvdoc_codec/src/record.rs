//! Record blobs.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::collections::BTreeMap;

/// One stored document: attribute name to value.
///
/// Attributes iterate in name order, so encoding a record is deterministic.
pub type Record = BTreeMap<String, Value>;

/// Encodes a record as the JSON object stored under its record key.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_record(record: &Record) -> CodecResult<String> {
    Ok(serde_json::to_string(record)?)
}

/// Decodes a record blob.
///
/// # Errors
///
/// Returns an error if the blob is not valid JSON or not a JSON object.
pub fn decode_record(blob: &str) -> CodecResult<Record> {
    let json: serde_json::Value = serde_json::from_str(blob)?;
    record_from_json(json)
}

/// Converts a JSON object into a record.
///
/// # Errors
///
/// Returns [`CodecError::NotAnObject`] for any other JSON value.
pub fn record_from_json(json: serde_json::Value) -> CodecResult<Record> {
    match Value::from(json) {
        Value::Object(map) => Ok(map),
        other => Err(CodecError::NotAnObject {
            found: other.kind(),
        }),
    }
}

/// Converts a record into a JSON object.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    serde_json::Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}
