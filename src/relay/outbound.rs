//! Outbound HTTP execution.
//!
//! # Responsibilities
//! - Turn a target URL and [`CallOptions`] into a real HTTP request
//! - Keep framing headers out of the forwarded set
//! - Apply the configured connect timeout and optional deadline
//!
//! # Design Decisions
//! - No retries: each descriptor is dispatched exactly once
//! - `Dispatch` is the seam tests replace; the orchestrator never sees `reqwest::Client`

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};

use crate::config::OutboundConfig;
use crate::relay::body::OutboundBody;
use crate::relay::buffer;
use crate::relay::call::CallOptions;
use crate::relay::error::{RelayError, RelayResult};

/// Headers the HTTP client derives itself.
const SKIPPED_HEADERS: [&str; 5] = [
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
    "keep-alive",
];

/// Performs one outbound call.
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(
        &self,
        url: String,
        call: CallOptions,
    ) -> impl Future<Output = RelayResult<reqwest::Response>> + Send;
}

/// `reqwest`-backed dispatcher.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    pub fn new(config: &OutboundConfig) -> RelayResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .no_proxy();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Dispatch for HttpDispatcher {
    async fn dispatch(&self, url: String, call: CallOptions) -> RelayResult<reqwest::Response> {
        let request = build_request(&self.client, &url, call)?;
        Ok(self.client.execute(request).await?)
    }
}

/// Build the `reqwest` request for a call; the method defaults to GET.
pub fn build_request(client: &Client, url: &str, call: CallOptions) -> RelayResult<reqwest::Request> {
    let method = match call.method.as_deref().map(str::trim) {
        None | Some("") => Method::GET,
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| RelayError::InvalidMethod(m.to_string()))?,
    };
    let url = reqwest::Url::parse(url).map_err(|_| RelayError::InvalidUrl(url.to_string()))?;

    let multipart = matches!(call.body, Some(OutboundBody::Multipart(_)));
    let headers = forwarded_headers(call.headers.as_ref(), multipart)?;

    let mut builder = client.request(method, url).headers(headers);
    builder = match call.body {
        None => builder,
        Some(OutboundBody::Multipart(form)) => builder.multipart(form.into_form()?),
        Some(OutboundBody::Raw(value)) => match raw_bytes(value) {
            Some(bytes) => builder.body(bytes),
            None => builder,
        },
    };

    Ok(builder.build()?)
}

fn forwarded_headers(
    headers: Option<&std::collections::BTreeMap<String, String>>,
    multipart: bool,
) -> RelayResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.into_iter().flatten() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::InvalidHeader { name: name.clone() })?;
        if SKIPPED_HEADERS.contains(&name.as_str()) || (multipart && name == CONTENT_TYPE) {
            continue;
        }
        let value = HeaderValue::from_str(value).map_err(|_| RelayError::InvalidHeader {
            name: name.to_string(),
        })?;
        map.append(name, value);
    }
    Ok(map)
}

/// Wire bytes of a raw body: strings as-is, Buffer-shaped values as their bytes,
/// anything else as JSON text.
fn raw_bytes(value: serde_json::Value) -> Option<Vec<u8>> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.into_bytes()),
        Value::Object(_) => match buffer::buffer_bytes(&value) {
            Some(bytes) => Some(bytes),
            None => Some(value.to_string().into_bytes()),
        },
        other => Some(other.to_string().into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::body::FormData;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn request(call: CallOptions) -> RelayResult<reqwest::Request> {
        build_request(&Client::new(), "http://local.test/x?a=b", call)
    }

    fn body_bytes(request: &reqwest::Request) -> Option<Vec<u8>> {
        request.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec)
    }

    #[test]
    fn test_defaults_to_get_without_body() {
        let request = request(CallOptions::default()).unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "http://local.test/x?a=b");
        assert!(request.body().is_none());
    }

    #[test]
    fn test_raw_bodies() {
        let call = |body| CallOptions {
            method: Some("post".into()),
            body: Some(OutboundBody::Raw(body)),
            ..CallOptions::default()
        };

        let req = request(call(json!("name=x"))).unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(body_bytes(&req), Some(b"name=x".to_vec()));

        let req = request(call(json!({"name": "x"}))).unwrap();
        assert_eq!(body_bytes(&req), Some(br#"{"name":"x"}"#.to_vec()));

        let req = request(call(json!({"type": "Buffer", "data": [1, 2]}))).unwrap();
        assert_eq!(body_bytes(&req), Some(vec![1, 2]));
    }

    #[test]
    fn test_framing_headers_are_not_forwarded() {
        let headers = BTreeMap::from([
            ("host".to_string(), "relay.example.com".to_string()),
            ("content-length".to_string(), "999".to_string()),
            ("x-trace".to_string(), "abc".to_string()),
            ("content-type".to_string(), "multipart/form-data; boundary=old".to_string()),
        ]);
        let form = CallOptions {
            method: Some("POST".into()),
            headers: Some(headers.clone()),
            body: Some(OutboundBody::Multipart(FormData::default())),
        };
        let req = request(form).unwrap();
        assert_eq!(req.headers()["x-trace"], "abc");
        assert!(req.headers().get("host").is_none());
        assert_ne!(
            req.headers().get("content-length").map(|v| v.as_bytes()),
            Some(&b"999"[..])
        );
        let content_type = req.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(!content_type.contains("boundary=old"));

        let raw = CallOptions {
            method: Some("POST".into()),
            headers: Some(headers),
            body: Some(OutboundBody::Raw(json!("x"))),
        };
        let req = request(raw).unwrap();
        assert_eq!(req.headers()[CONTENT_TYPE], "multipart/form-data; boundary=old");
        assert!(req.headers().get("host").is_none());
        assert_ne!(
            req.headers().get("content-length").map(|v| v.as_bytes()),
            Some(&b"999"[..])
        );
    }

    #[test]
    fn test_multipart_body_is_attached() {
        let call = CallOptions {
            method: Some("POST".into()),
            headers: None,
            body: Some(OutboundBody::Multipart(FormData::default())),
        };
        let req = request(call).unwrap();
        let content_type = req.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn test_invalid_inputs() {
        let bad_method = CallOptions {
            method: Some("G E T".into()),
            ..CallOptions::default()
        };
        assert!(matches!(request(bad_method), Err(RelayError::InvalidMethod(_))));

        let bad_header = CallOptions {
            headers: Some(BTreeMap::from([("bad header".to_string(), "v".to_string())])),
            ..CallOptions::default()
        };
        assert!(matches!(
            request(bad_header),
            Err(RelayError::InvalidHeader { .. })
        ));

        let err = build_request(&Client::new(), "/relative", CallOptions::default()).unwrap_err();
        assert!(matches!(err, RelayError::InvalidUrl(_)));
    }
}
