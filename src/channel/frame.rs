//! Event frames exchanged over the channel.
//!
//! Every WebSocket text frame carries one JSON object:
//!
//! ```text
//! {"event": "connection_request", "data": { ...descriptor... }}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::ChannelError;

/// A named event and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_text(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(ChannelError::Encode)
    }

    pub fn from_text(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(ChannelError::Decode)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ChannelError> {
        serde_json::from_slice(bytes).map_err(ChannelError::Decode)
    }
}

/// Event names derived from a configured prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    pub create: String,
    pub request: String,
    pub response: String,
}

impl EventNames {
    pub fn new(prefix: &str) -> Self {
        Self {
            create: format!("{prefix}_create"),
            request: format!("{prefix}_request"),
            response: format!("{prefix}_response"),
        }
    }
}

impl Default for EventNames {
    fn default() -> Self {
        Self::new("connection")
    }
}
