//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay client.
//! All types derive Serde traits for deserialization from config files.

use serde::{de, Deserialize, Deserializer, Serialize};

/// Host used when the local target is given as a bare port.
pub const LOCAL_HOST: &str = "http://localhost";

/// Root configuration for the relay client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Rendezvous server and local target.
    pub connection: ConnectionOptions,

    /// Channel transport settings.
    pub channel: ChannelConfig,

    /// Outbound HTTP client settings.
    pub outbound: OutboundConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Where to connect and which local service to drive.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Rendezvous server URL (e.g., "https://relay.example.com").
    pub server: Option<String>,

    /// Base URL of the local target. Takes precedence over `port`.
    pub href: Option<String>,

    /// Port of a target listening on localhost; a number or a numeric string.
    #[serde(deserialize_with = "port_number")]
    pub port: Option<u16>,
}

fn port_number<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid port '{}'", text))),
    }
}

impl ConnectionOptions {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            ..Self::default()
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Server URL, treating an empty string as absent.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Local href, treating an empty string as absent.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Local port, treating 0 as absent.
    pub fn port(&self) -> Option<u16> {
        self.port.filter(|p| *p != 0)
    }

    /// Base URL that relayed paths are appended to.
    ///
    /// `href` wins over `port`; `None` when neither is usable.
    pub fn target_base(&self) -> Option<String> {
        match (self.href(), self.port()) {
            (Some(href), _) => Some(href.to_string()),
            (None, Some(port)) => Some(format!("{}:{}", LOCAL_HOST, port)),
            (None, None) => None,
        }
    }
}

/// Channel transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Prefix for the create/request/response event names.
    pub event_prefix: String,

    /// Path appended to the server URL when opening the WebSocket.
    pub path: String,

    /// Reconnect after the channel drops or fails to connect.
    pub reconnect: bool,

    /// Base delay for exponential reconnect backoff in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Maximum reconnect delay in milliseconds.
    pub reconnect_max_delay_ms: u64,

    /// Give up after this many consecutive failed attempts (unlimited when unset).
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_prefix: "connection".to_string(),
            path: String::new(),
            reconnect: true,
            reconnect_base_delay_ms: 500,
            reconnect_max_delay_ms: 5000,
            max_reconnect_attempts: None,
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Total deadline for a relayed call in seconds. No deadline when unset.
    pub request_timeout_secs: Option<u64>,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// User-Agent sent when the relayed request carries none.
    pub user_agent: String,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            connect_timeout_secs: 5,
            user_agent: format!("passoul/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
