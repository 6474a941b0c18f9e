//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the connection options before any channel is opened
//! - Validate value ranges (delays, addresses, event prefix)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Connection options are validated separately: the CLI may supply them
//!   after the file has been loaded

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ConnectionOptions, RelayConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server is required")]
    MissingServer,

    #[error("port or href is required")]
    MissingTarget,

    #[error("server '{0}' is not a valid URL")]
    InvalidServer(String),

    #[error("href '{0}' is not a valid URL")]
    InvalidHref(String),

    #[error("channel.event_prefix must not be empty")]
    EmptyEventPrefix,

    #[error("channel.reconnect_base_delay_ms ({base}) exceeds reconnect_max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate the options a connection is created from.
pub fn validate_connection(options: &ConnectionOptions) -> Result<(), Vec<ValidationError>> {
    let Some(server) = options.server() else {
        return Err(vec![ValidationError::MissingServer]);
    };

    let mut errors = Vec::new();

    if Url::parse(server).is_err() {
        errors.push(ValidationError::InvalidServer(server.to_string()));
    }

    match (options.href(), options.port()) {
        (None, None) => errors.push(ValidationError::MissingTarget),
        (Some(href), _) if Url::parse(href).is_err() => {
            errors.push(ValidationError::InvalidHref(href.to_string()));
        }
        _ => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the settings sections of a loaded configuration file.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.channel.event_prefix.trim().is_empty() {
        errors.push(ValidationError::EmptyEventPrefix);
    }

    let (base, max) = (
        config.channel.reconnect_base_delay_ms,
        config.channel.reconnect_max_delay_ms,
    );
    if base > max {
        errors.push(ValidationError::BackoffRange { base, max });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
