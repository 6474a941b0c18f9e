//! Relay error definitions.

use thiserror::Error;

use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::relay::descriptor::ErrorDescription;

/// Errors that can occur while creating a connection or relaying a request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid connection options; raised before any connection attempt.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The channel could not reach the rendezvous server.
    #[error("connect error: {0}")]
    Connect(String),

    /// The channel ended before a session was established.
    #[error("channel closed before a session was established")]
    ChannelClosed,

    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The request payload is not a valid descriptor.
    #[error("malformed request descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("invalid method '{0}'")]
    InvalidMethod(String),

    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("invalid target URL '{0}'")]
    InvalidUrl(String),

    /// The outbound call or reading its body failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be decoded for its content type.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Convenience result type.
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// Short stable identifier used in error envelopes and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "config",
            RelayError::Connect(_) => "connect",
            RelayError::ChannelClosed => "channel_closed",
            RelayError::Channel(_) => "channel",
            RelayError::Descriptor(_) => "descriptor",
            RelayError::InvalidMethod(_) => "invalid_method",
            RelayError::InvalidHeader { .. } => "invalid_header",
            RelayError::InvalidUrl(_) => "invalid_url",
            RelayError::Http(e) if e.is_timeout() => "timeout",
            RelayError::Http(e) if e.is_connect() => "connect_refused",
            RelayError::Http(_) => "http",
            RelayError::Decode(_) => "decode",
        }
    }

    pub fn describe(&self) -> ErrorDescription {
        ErrorDescription {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;

    #[test]
    fn test_config_error_is_transparent() {
        let err = RelayError::from(ConfigError::Validation(vec![ValidationError::MissingServer]));
        assert_eq!(err.kind(), "config");
        assert_eq!(err.to_string(), "Passoul: server is required");
    }

    #[test]
    fn test_describe() {
        let description = RelayError::InvalidMethod("G E T".into()).describe();
        assert_eq!(description.kind, "invalid_method");
        assert_eq!(description.message, "invalid method 'G E T'");
    }
}
