//! Channel transport subsystem.
//!
//! # Data Flow
//! ```text
//! Rendezvous server ←── frames ──→ transport driver task
//!                                     │  ChannelEvent (mpsc) → orchestrator
//!                                     └─ Frame (mpsc)        ← Emitter::emit
//! ```
//!
//! # Design Decisions
//! - A transport is message passing only: `open` spawns a driver and hands back
//!   an event receiver plus a cloneable emitter
//! - Reconnection belongs to the transport; the orchestrator only reacts to
//!   `Connected` / `Disconnected` / `ConnectError`
//! - Dropping the event receiver shuts the driver down
//! - Frames emitted while disconnected stay queued until the next connection

pub mod frame;
pub mod memory;
pub mod reconnect;
pub mod websocket;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

pub use frame::{EventNames, Frame};
pub use memory::{MemoryPeer, MemoryTransport};
pub use reconnect::ReconnectPolicy;
pub use websocket::WebSocketTransport;

/// Errors raised by the channel layer.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,

    #[error("failed to encode frame: {0}")]
    Encode(serde_json::Error),

    #[error("failed to decode frame: {0}")]
    Decode(serde_json::Error),

    #[error("unsupported server URL '{0}'")]
    UnsupportedUrl(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),
}

/// Lifecycle and message events delivered by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The transport reached the server (first time or after a reconnect).
    Connected,
    /// An established connection dropped.
    Disconnected { reason: String },
    /// A connection attempt failed.
    ConnectError(String),
    /// A named event from the remote side.
    Message(Frame),
}

/// Cloneable handle for emitting events on a channel.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<Frame>,
}

impl Emitter {
    pub fn new(tx: mpsc::UnboundedSender<Frame>) -> Self {
        Self { tx }
    }

    /// Queue `payload` under `event` for delivery to the remote side.
    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) -> Result<(), ChannelError> {
        let data = serde_json::to_value(payload).map_err(ChannelError::Encode)?;
        self.tx
            .send(Frame::new(event, data))
            .map_err(|_| ChannelError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// One opened channel: incoming events and the outgoing emitter.
#[derive(Debug)]
pub struct Channel {
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
    pub emitter: Emitter,
}

impl Channel {
    /// Create a channel and the driver-side ends of its queues.
    pub fn pair() -> (
        Self,
        mpsc::UnboundedSender<ChannelEvent>,
        mpsc::UnboundedReceiver<Frame>,
    ) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let channel = Self {
            events,
            emitter: Emitter::new(frames_tx),
        };
        (channel, events_tx, frames_rx)
    }
}

/// The persistent bidirectional connection to a rendezvous server.
///
/// `open` must not block: implementations spawn their driver on the current
/// tokio runtime and report progress through [`ChannelEvent`]s.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, server: &Url) -> Channel;
}
