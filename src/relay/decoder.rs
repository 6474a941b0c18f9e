//! Response decoding.
//!
//! # Responsibilities
//! - Flatten response headers into a plain map
//! - Pick text / JSON / binary decoding from `content-type`
//! - Drain the body fully before the envelope is built
//!
//! # Design Decisions
//! - Substring matching, `text/` checked before `/json`
//! - Anything unrecognised (or no content-type at all) stays binary

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, CONTENT_TYPE};

use crate::relay::descriptor::ResponseBody;
use crate::relay::error::{RelayError, RelayResult};

/// How a response body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Json,
    Binary,
}

pub fn classify(content_type: Option<&str>) -> ContentKind {
    match content_type {
        Some(t) if t.contains("text/") => ContentKind::Text,
        Some(t) if t.contains("/json") => ContentKind::Json,
        _ => ContentKind::Binary,
    }
}

/// Headers as a plain map; repeated headers are joined with ", ".
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    flat
}

/// A response ready to be placed in an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    pub headers: BTreeMap<String, String>,
    pub response: ResponseBody,
}

/// Decode a response, consuming its body.
pub async fn decode(response: reqwest::Response) -> RelayResult<DecodedResponse> {
    let headers = flatten_headers(response.headers());
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match classify(content_type.as_deref()) {
        ContentKind::Text => ResponseBody::Text(response.text().await?),
        ContentKind::Json => {
            let bytes = response.bytes().await?;
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| RelayError::Decode(format!("invalid JSON body: {e}")))?;
            ResponseBody::Json(value)
        }
        ContentKind::Binary => ResponseBody::Binary(response.bytes().await?.to_vec()),
    };

    Ok(DecodedResponse {
        headers,
        response: body,
    })
}
