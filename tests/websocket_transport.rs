//! End-to-end tests: real WebSocket rendezvous server, real HTTP backend.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use passoul::channel::Frame;
use passoul::config::RelayConfig;
use passoul::relay::{relay, HttpDispatcher, RequestDescriptor};
use passoul::{ConnectionOptions, RelayClient, RelayError};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

mod common;
use common::Canned;

const WAIT: Duration = Duration::from_secs(10);

/// Rendezvous stand-in: sends `script` frames to the first client, then
/// forwards every frame the client sends back.
async fn start_rendezvous(script: Vec<Frame>) -> (SocketAddr, mpsc::UnboundedReceiver<Frame>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        for frame in script {
            ws.send(Message::text(frame.to_text().unwrap())).await.unwrap();
        }
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let _ = tx.send(Frame::from_text(text.as_str()).unwrap());
            }
        }
    });

    (addr, rx)
}

fn descriptor(value: Value) -> RequestDescriptor {
    serde_json::from_value(value).unwrap()
}

fn dispatcher() -> HttpDispatcher {
    HttpDispatcher::new(&RelayConfig::default().outbound).unwrap()
}

#[tokio::test]
async fn test_dispatcher_from_custom_client() {
    let (backend, mut captured) = common::start_mock_backend(Canned::new("text/plain", "ok")).await;
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .user_agent("custom-agent/1.0")
        .build()
        .unwrap();
    let dispatcher = HttpDispatcher::from_client(client);

    let descriptor = descriptor(json!({"beacon": "c", "method": "DELETE", "originalUrl": "/items/1"}));
    relay(&dispatcher, &format!("http://{}", backend), &descriptor)
        .await
        .unwrap();

    let request = timeout(WAIT, captured.recv()).await.unwrap().unwrap();
    assert_eq!(request.request_line(), "DELETE /items/1 HTTP/1.1");
    assert_eq!(request.header("user-agent").as_deref(), Some("custom-agent/1.0"));
}

#[tokio::test]
async fn test_end_to_end_over_websocket() {
    let (backend, mut captured) =
        common::start_mock_backend(Canned::new("application/json", r#"{"ok":true}"#)).await;
    let (server, mut emitted) = start_rendezvous(vec![
        Frame::new("connection_create", json!({"hostname": "e2e.relay.test"})),
        Frame::new(
            "connection_request",
            json!({
                "beacon": "e2e-1",
                "method": "POST",
                "originalUrl": "/echo",
                "search": "?x=1",
                "headers": {"content-type": "application/json", "x-trace": "t-9"},
                "body": {"a": 1},
            }),
        ),
    ])
    .await;

    let client = RelayClient::from_config(&RelayConfig::default()).unwrap();
    let options = ConnectionOptions::new(format!("http://{}", server)).with_port(backend.port());
    let connection = timeout(WAIT, client.create(&options).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        client.session(&connection).unwrap().public_url().as_deref(),
        Some("http://e2e.relay.test")
    );

    let frame = timeout(WAIT, emitted.recv()).await.unwrap().unwrap();
    assert_eq!(frame.event, "connection_response");
    assert_eq!(frame.data["beacon"], json!("e2e-1"));
    assert_eq!(frame.data["response"], json!({"ok": true}));
    assert_eq!(frame.data["headers"]["content-type"], json!("application/json"));

    let request = timeout(WAIT, captured.recv()).await.unwrap().unwrap();
    assert_eq!(request.request_line(), "POST /echo?x=1 HTTP/1.1");
    assert_eq!(request.header("x-trace").as_deref(), Some("t-9"));
    assert_eq!(request.body_text(), r#"{"a":1}"#);
}

#[tokio::test]
async fn test_unreachable_server_rejects_create() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = RelayConfig::default();
    config.channel.reconnect = false;
    let client = RelayClient::from_config(&config).unwrap();
    let options = ConnectionOptions::new(format!("http://{}", addr)).with_port(8080);

    let result = timeout(WAIT, client.create(&options).unwrap()).await.unwrap();
    assert!(matches!(result, Err(RelayError::Connect(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_multipart_reaches_backend() {
    let (backend, mut captured) = common::start_mock_backend(Canned::new("text/plain", "ok")).await;

    let descriptor = descriptor(json!({
        "beacon": "m",
        "method": "POST",
        "originalUrl": "/upload",
        "type": "multipart/form-data",
        "headers": {"content-type": "multipart/form-data; boundary=stale", "x-user": "u1"},
        "files": {
            "avatar": {"buffer": [104, 105], "mimetype": "image/png", "originalFilename": "a.png"},
        },
        "body": {"title": "hello"},
    }));

    let decoded = relay(&dispatcher(), &format!("http://{}", backend), &descriptor)
        .await
        .unwrap();
    assert_eq!(decoded.response, passoul::relay::ResponseBody::Text("ok".into()));

    let request = timeout(WAIT, captured.recv()).await.unwrap().unwrap();
    let content_type = request.header("content-type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(!content_type.contains("stale"));
    assert_eq!(request.header("x-user").as_deref(), Some("u1"));

    let body = request.body_text();
    assert!(body.contains(r#"name="avatar"; filename="a.png""#));
    assert!(body.contains("Content-Type: image/png"));
    assert!(body.contains("\r\n\r\nhi\r\n"));
    assert!(body.contains(r#"name="title""#));
    assert!(body.contains("\r\n\r\nhello\r\n"));
}

#[tokio::test]
async fn test_pre_encoded_multipart_keeps_its_boundary() {
    let (backend, mut captured) = common::start_mock_backend(Canned::new("text/plain", "ok")).await;
    let encoded = "--abc\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nhello\r\n--abc--\r\n";

    let descriptor = descriptor(json!({
        "beacon": "p",
        "method": "POST",
        "originalUrl": "/upload",
        "type": "multipart/form-data; boundary=abc",
        "headers": {"content-type": "multipart/form-data; boundary=abc"},
        "body": encoded,
    }));

    relay(&dispatcher(), &format!("http://{}", backend), &descriptor)
        .await
        .unwrap();

    let request = timeout(WAIT, captured.recv()).await.unwrap().unwrap();
    assert_eq!(
        request.header("content-type").as_deref(),
        Some("multipart/form-data; boundary=abc")
    );
    assert_eq!(request.body_text(), encoded);
}

#[tokio::test]
async fn test_get_never_sends_a_body() {
    let (backend, mut captured) = common::start_mock_backend(Canned::new("text/plain", "ok")).await;

    let descriptor = descriptor(json!({
        "beacon": "g",
        "method": "GET",
        "originalUrl": "/x",
        "search": "?a=b",
        "headers": {"host": "public.relay.test", "content-length": "99"},
        "body": "should not be sent",
    }));

    relay(&dispatcher(), &format!("http://{}", backend), &descriptor)
        .await
        .unwrap();

    let request = timeout(WAIT, captured.recv()).await.unwrap().unwrap();
    assert_eq!(request.request_line(), "GET /x?a=b HTTP/1.1");
    assert_eq!(request.header("host"), Some(backend.to_string()));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_refused_target_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let descriptor = descriptor(json!({"beacon": "r", "originalUrl": "/"}));
    let err = relay(&dispatcher(), &format!("http://{}", addr), &descriptor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "connect_refused");
    assert_eq!(err.describe().kind, "connect_refused");
}
