//! Connection identity, state, and the handle returned by `create`.
//!
//! # Responsibilities
//! - Generate unique connection IDs (the session table key)
//! - Publish connection state (Connecting → AwaitingSession → Ready → Closed)
//! - Let callers emit on, and wait for the end of, a connection

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;

use crate::channel::{ChannelError, Emitter};

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not opened yet.
    Idle,
    /// Channel opened, transport not connected (or reconnecting).
    Connecting,
    /// Transport connected, waiting for session-create.
    AwaitingSession,
    /// Session established; requests are relayed.
    Ready,
    /// Terminal.
    Closed,
}

/// Handle to a live connection.
///
/// The connection stays open while at least one clone of the handle exists
/// (or until the transport gives up).
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    emitter: Emitter,
    state: watch::Receiver<ConnectionState>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        emitter: Emitter,
        state: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self { id, emitter, state }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the connection reaches [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == ConnectionState::Closed).await;
    }

    /// Emit an arbitrary event on the channel.
    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) -> Result<(), ChannelError> {
        self.emitter.emit(event, payload)
    }
}
