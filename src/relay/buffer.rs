//! Byte sequences on a JSON wire.
//!
//! Accepted encodings:
//! - an array of octets: `[104, 105]`
//! - Node's `Buffer.toJSON()` shape: `{"type": "Buffer", "data": [104, 105]}`
//! - a standard base64 string (file buffers only): `"aGk="`
//!
//! Binary values are always written back in the `Buffer` shape.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::SerializeStruct;
use serde::Serializer;
use serde_json::Value;

/// Bytes from an octet array or a `Buffer`-shaped object.
pub fn buffer_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Array(items) => octets(items),
        Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("Buffer") => {
            map.get("data").and_then(Value::as_array).and_then(|items| octets(items))
        }
        _ => None,
    }
}

/// Like [`buffer_bytes`], additionally decoding base64 strings.
pub fn file_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(encoded) => STANDARD.decode(encoded.trim()).ok(),
        other => buffer_bytes(other),
    }
}

fn octets(items: &[Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

/// Serialize bytes as `{"type": "Buffer", "data": [...]}`.
pub fn serialize_buffer<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("Buffer", 2)?;
    state.serialize_field("type", "Buffer")?;
    state.serialize_field("data", bytes)?;
    state.end()
}
