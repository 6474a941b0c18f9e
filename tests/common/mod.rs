//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use passoul::relay::{CallOptions, Dispatch, RelayError, RelayResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Canned response served by [`Recorder`] and the mock backend.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn new(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            body: body.into(),
        }
    }

    pub fn untyped(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

type Script = dyn Fn(&str, &CallOptions) -> Result<Canned, String> + Send + Sync;

/// In-process dispatcher that records every call and answers from a script.
///
/// An `Err` from the script surfaces as a connect error.
#[derive(Clone)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(String, CallOptions)>>>,
    script: Arc<Script>,
    delay: Option<Duration>,
}

impl Recorder {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, &CallOptions) -> Result<Canned, String> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(script),
            delay: None,
        }
    }

    /// Always answers with `canned`.
    pub fn fixed(canned: Canned) -> Self {
        Self::new(move |_, _| Ok(canned.clone()))
    }

    /// Delay answers for URLs containing `/slow`.
    pub fn with_slow_paths(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, CallOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Dispatch for Recorder {
    async fn dispatch(&self, url: String, call: CallOptions) -> RelayResult<reqwest::Response> {
        self.calls.lock().unwrap().push((url.clone(), call.clone()));
        if let Some(delay) = self.delay {
            if url.contains("/slow") {
                tokio::time::sleep(delay).await;
            }
        }

        let canned = (self.script)(&url, &call).map_err(RelayError::Connect)?;
        let mut builder = http::Response::builder().status(canned.status);
        if let Some(content_type) = canned.content_type {
            builder = builder.header("content-type", content_type);
        }
        let response = builder.body(canned.body).unwrap();
        Ok(reqwest::Response::from(response))
    }
}

/// A raw request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or("")
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Start a mock HTTP backend on an ephemeral port.
///
/// Every request is captured and answered with `canned`.
pub async fn start_mock_backend(
    canned: Canned,
) -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let tx = tx.clone();
                    let canned = canned.clone();
                    tokio::spawn(async move {
                        if let Some(request) = read_request(&mut socket).await {
                            let _ = tx.send(request);
                        }
                        let _ = socket.write_all(&render(&canned)).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

fn render(canned: &Canned) -> Vec<u8> {
    let status_text = match canned.status {
        200 => "200 OK",
        201 => "201 Created",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        _ => "200 OK",
    };
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status_text,
        canned.body.len()
    );
    if let Some(content_type) = canned.content_type {
        head.push_str(&format!("Content-Type: {}\r\n", content_type));
    }
    head.push_str("\r\n");

    let mut out = head.into_bytes();
    out.extend_from_slice(&canned.body);
    out
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut request = CapturedRequest {
        head,
        body: Vec::new(),
    };
    let chunked = request
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
    let length = request
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok());

    let mut body = buf[head_end..].to_vec();
    if chunked {
        while find(&body, b"0\r\n\r\n").is_none() {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        request.body = dechunk(&body);
    } else {
        let length = length.unwrap_or(0);
        while body.len() < length {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        request.body = body;
    }

    Some(request)
}

fn dechunk(mut raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(raw, b"\r\n") {
        let size = std::str::from_utf8(&raw[..line_end])
            .ok()
            .and_then(|s| usize::from_str_radix(s.trim(), 16).ok())
            .unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        let end = (start + size).min(raw.len());
        out.extend_from_slice(&raw[start..end]);
        raw = raw.get(end + 2..).unwrap_or(&[]);
    }
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
