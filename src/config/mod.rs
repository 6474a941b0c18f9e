//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks on settings)
//!     → command-line flags override [connection]
//!     → validation.rs (connection checks, inside create())
//!     → RelayConfig shared by the client
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A bad connection config is fatal and never retried

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ChannelConfig, ConnectionOptions, LogFormat, ObservabilityConfig, OutboundConfig,
    RelayConfig, LOCAL_HOST,
};
pub use validation::ValidationError;
