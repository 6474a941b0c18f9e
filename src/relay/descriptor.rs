//! Wire model for relayed requests and their responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::relay::buffer;

/// Opaque correlation id echoed from a request onto its response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Beacon(pub Value);

impl Beacon {
    /// Recover the beacon from a payload that failed to parse as a descriptor.
    pub fn recover(payload: &Value) -> Option<Self> {
        payload.get("beacon").cloned().map(Beacon)
    }
}

impl From<&str> for Beacon {
    fn from(id: &str) -> Self {
        Self(Value::String(id.to_string()))
    }
}

impl std::fmt::Display for Beacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(id) => f.write_str(id),
            other => write!(f, "{}", other),
        }
    }
}

/// An HTTP call to perform against the local target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    #[serde(default)]
    pub beacon: Beacon,

    pub method: Option<String>,

    #[serde(default, deserialize_with = "header_map")]
    pub headers: Option<BTreeMap<String, String>>,

    pub original_url: Option<String>,

    pub search: Option<String>,

    /// Content-type hint, e.g. "multipart/form-data".
    #[serde(rename = "type")]
    pub content_type: Option<String>,

    pub body: Option<Value>,

    /// Attachments keyed by form field name; values are [`FileSource`]-shaped.
    pub files: Option<Map<String, Value>>,
}

impl RequestDescriptor {
    /// Path and query appended to the target base.
    pub fn path_and_query(&self) -> String {
        format!(
            "{}{}",
            self.original_url.as_deref().unwrap_or_default(),
            self.search.as_deref().unwrap_or_default()
        )
    }
}

/// Header values arrive as strings, or as arrays for repeated headers.
fn header_map<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|raw| {
        raw.into_iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::Null => return None,
                    Value::String(s) => s,
                    Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", "),
                    other => other.to_string(),
                };
                Some((name, value))
            })
            .collect()
    }))
}

/// An in-memory file attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSource {
    pub buffer: Vec<u8>,
    pub mimetype: Option<String>,
    pub original_filename: Option<String>,
}

impl FileSource {
    /// Parse a file attachment. `None` unless the value carries a non-empty buffer.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let buffer = object.get("buffer").and_then(buffer::file_bytes)?;
        if buffer.is_empty() {
            return None;
        }

        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            buffer,
            mimetype: text("mimetype"),
            original_filename: text("originalFilename"),
        })
    }

    /// Whether a value is shaped like an attachment, usable or not.
    pub fn is_file_shaped(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|o| o.contains_key("buffer") || o.contains_key("originalFilename"))
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(Value),
    Binary(Vec<u8>),
}

impl Serialize for ResponseBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResponseBody::Text(text) => serializer.serialize_str(text),
            ResponseBody::Json(value) => value.serialize(serializer),
            ResponseBody::Binary(bytes) => buffer::serialize_buffer(bytes, serializer),
        }
    }
}

/// Failure reported to the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescription {
    pub kind: String,
    pub message: String,
}

/// Either the decoded response or the failure, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Success {
        headers: BTreeMap<String, String>,
        response: ResponseBody,
    },
    Failure {
        error: ErrorDescription,
    },
}

/// What is emitted for every relayed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub beacon: Beacon,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ResponseEnvelope {
    pub fn success(
        beacon: Beacon,
        headers: BTreeMap<String, String>,
        response: ResponseBody,
    ) -> Self {
        Self {
            beacon,
            outcome: Outcome::Success { headers, response },
        }
    }

    pub fn failure(beacon: Beacon, error: ErrorDescription) -> Self {
        Self {
            beacon,
            outcome: Outcome::Failure { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}
