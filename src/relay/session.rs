//! Session side table.
//!
//! Maps a connection id to the metadata the rendezvous server sent on
//! session-create. The table holds ids, never connection handles, so it does
//! not keep a connection alive; entries are removed explicitly on disconnect,
//! connect error, or when the connection closes.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::metrics;
use crate::relay::connection::ConnectionId;

/// Metadata describing an established connection, e.g. `{"hostname": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(pub Value);

impl Session {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn hostname(&self) -> Option<&str> {
        self.get("hostname").and_then(Value::as_str)
    }

    /// Public URL the remote side exposes for this connection.
    pub fn public_url(&self) -> Option<String> {
        self.hostname().map(|hostname| format!("http://{}", hostname))
    }
}

/// Thread-safe map of connection id → session.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<DashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the session for a connection, replacing any previous one.
    pub fn insert(&self, id: ConnectionId, session: Session) -> Option<Session> {
        let previous = self.inner.insert(id, session);
        metrics::record_sessions(self.inner.len());
        previous
    }

    /// Most recently stored session for a connection.
    pub fn get(&self, id: ConnectionId) -> Option<Session> {
        self.inner.get(&id).map(|r| r.value().clone())
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Session> {
        let removed = self.inner.remove(&id).map(|(_, session)| session);
        if removed.is_some() {
            metrics::record_sessions(self.inner.len());
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.inner.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
