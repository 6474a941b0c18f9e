//! Passoul: drive a private HTTP service through a rendezvous server.
//!
//! The client opens one persistent channel to a rendezvous server, receives
//! request descriptors over it, performs each one against a local target and
//! ships the decoded response back under the request's beacon.

pub mod channel;
pub mod config;
pub mod observability;
pub mod relay;

pub use config::{ConnectionOptions, RelayConfig};
pub use relay::{Connection, PendingConnection, RelayClient, RelayError, Session};
