//! WebSocket transport.
//!
//! # Responsibilities
//! - Map the rendezvous server URL onto a `ws://` / `wss://` endpoint
//! - Keep one WebSocket open, reconnecting per [`ReconnectPolicy`]
//! - Decode incoming text/binary frames into [`ChannelEvent::Message`]
//! - Flush emitted frames while connected
//!
//! # Design Decisions
//! - Frame-level forwarding, no buffering beyond the emit queue
//! - Ping/pong handled by tungstenite
//! - Undecodable frames are logged and skipped, never fatal

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::channel::{Channel, ChannelError, ChannelEvent, Frame, ReconnectPolicy, Transport};
use crate::config::ChannelConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport speaking JSON event frames over a WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    path: String,
    policy: ReconnectPolicy,
}

impl WebSocketTransport {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            path: config.path.clone(),
            policy: ReconnectPolicy::from(config),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// WebSocket endpoint for a rendezvous server URL.
    pub fn endpoint(&self, server: &Url) -> Result<Url, ChannelError> {
        let scheme = match server.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return Err(ChannelError::UnsupportedUrl(server.to_string())),
        };

        let mut endpoint = server.clone();
        endpoint
            .set_scheme(scheme)
            .map_err(|_| ChannelError::UnsupportedUrl(server.to_string()))?;
        if !self.path.is_empty() {
            endpoint.set_path(&self.path);
        }
        Ok(endpoint)
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, server: &Url) -> Channel {
        let (channel, events, frames) = Channel::pair();
        let endpoint = self.endpoint(server);
        tokio::spawn(drive(endpoint, self.policy, events, frames));
        channel
    }
}

/// Why a connected session ended.
enum PumpExit {
    /// The local side went away; stop for good.
    Shutdown,
    /// The connection was lost; the driver may reconnect.
    Lost(String),
}

async fn drive(
    endpoint: Result<Url, ChannelError>,
    policy: ReconnectPolicy,
    events: mpsc::UnboundedSender<ChannelEvent>,
    mut frames: mpsc::UnboundedReceiver<Frame>,
) {
    let endpoint = match endpoint {
        Ok(endpoint) => endpoint,
        Err(e) => {
            let _ = events.send(ChannelEvent::ConnectError(e.to_string()));
            return;
        }
    };

    let mut failures: u32 = 0;

    loop {
        tracing::debug!(endpoint = %endpoint, "Opening channel");

        match connect_async(endpoint.as_str()).await {
            Ok((ws, _)) => {
                failures = 0;
                tracing::info!(endpoint = %endpoint, "Channel connected");
                if events.send(ChannelEvent::Connected).is_err() {
                    break;
                }

                match pump(ws, &events, &mut frames).await {
                    PumpExit::Shutdown => break,
                    PumpExit::Lost(reason) => {
                        tracing::warn!(endpoint = %endpoint, reason = %reason, "Channel lost");
                        if events.send(ChannelEvent::Disconnected { reason }).is_err() {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let error = ChannelError::from(Box::new(e));
                tracing::warn!(endpoint = %endpoint, attempt = failures, error = %error, "Channel connect failed");
                if events.send(ChannelEvent::ConnectError(error.to_string())).is_err() {
                    break;
                }
            }
        }

        if !policy.should_retry(failures) {
            tracing::info!(endpoint = %endpoint, "Channel giving up");
            break;
        }

        let delay = policy.delay(failures);
        tracing::debug!(endpoint = %endpoint, delay = ?delay, "Reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = events.closed() => break,
        }
    }
}

async fn pump(
    ws: WsStream,
    events: &mpsc::UnboundedSender<ChannelEvent>,
    frames: &mut mpsc::UnboundedReceiver<Frame>,
) -> PumpExit {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    let _ = sink.close().await;
                    return PumpExit::Shutdown;
                };
                let text = match frame.to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(event = %frame.event, error = %e, "Dropping unencodable frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    return PumpExit::Lost(e.to_string());
                }
            }
            message = stream.next() => {
                let decoded = match message {
                    Some(Ok(Message::Text(text))) => Frame::from_text(text.as_str()),
                    Some(Ok(Message::Binary(bytes))) => Frame::from_slice(&bytes),
                    Some(Ok(Message::Close(close))) => {
                        let reason = close
                            .map(|c| c.reason.as_str().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "server closed the channel".to_string());
                        return PumpExit::Lost(reason);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return PumpExit::Lost(e.to_string()),
                    None => return PumpExit::Lost("stream ended".to_string()),
                };

                match decoded {
                    Ok(frame) => {
                        if events.send(ChannelEvent::Message(frame)).is_err() {
                            let _ = sink.close().await;
                            return PumpExit::Shutdown;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Skipping undecodable frame"),
                }
            }
            _ = events.closed() => {
                let _ = sink.close().await;
                return PumpExit::Shutdown;
            }
        }
    }
}
