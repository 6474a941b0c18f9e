//! In-process transport.
//!
//! Each `open` hands a [`MemoryPeer`] to whoever holds the receiver returned by
//! [`MemoryTransport::new`]. The peer plays the rendezvous server: it delivers
//! lifecycle events and reads back what the client emitted.

use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use crate::channel::{Channel, ChannelEvent, Frame, Transport};

/// Transport whose remote side lives in the same process.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        (Self { peers }, rx)
    }
}

impl Transport for MemoryTransport {
    fn open(&self, server: &Url) -> Channel {
        let (channel, events, frames) = Channel::pair();
        let peer = MemoryPeer {
            server: server.clone(),
            events,
            frames,
        };
        if self.peers.send(peer).is_err() {
            tracing::warn!(server = %server, "Memory transport has no listener");
        }
        channel
    }
}

/// The server side of one in-memory channel.
#[derive(Debug)]
pub struct MemoryPeer {
    pub server: Url,
    events: mpsc::UnboundedSender<ChannelEvent>,
    frames: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// Deliver a raw lifecycle or message event. Returns false once the client
    /// side has gone away.
    pub fn send(&self, event: ChannelEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn connect(&self) -> bool {
        self.send(ChannelEvent::Connected)
    }

    pub fn disconnect(&self, reason: &str) -> bool {
        self.send(ChannelEvent::Disconnected {
            reason: reason.to_string(),
        })
    }

    pub fn connect_error(&self, error: &str) -> bool {
        self.send(ChannelEvent::ConnectError(error.to_string()))
    }

    /// Deliver a named event with its payload.
    pub fn deliver(&self, event: &str, data: Value) -> bool {
        self.send(ChannelEvent::Message(Frame::new(event, data)))
    }

    /// Next frame emitted by the client, `None` once the client dropped its emitters.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Whether the client stopped listening for events.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// Resolves when the client stops listening for events.
    pub async fn closed(&self) {
        self.events.closed().await
    }
}
