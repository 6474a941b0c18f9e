//! Request/response relay engine.
//!
//! # Data Flow
//! ```text
//! "<prefix>_request" payload
//!     → descriptor.rs (wire model)
//!     → body.rs (raw or rebuilt multipart body)
//!     → call.rs (method/headers/body + target URL)
//!     → outbound.rs (HTTP call against the local target)
//!     → decoder.rs (text / JSON / binary + flat headers)
//!     → "<prefix>_response" {beacon, headers, response} | {beacon, error}
//! ```
//!
//! # Design Decisions
//! - One task per request; responses carry their own beacon, order is not kept
//! - A failed request is reported to the remote side and never closes the connection
//! - Sessions live in a side table keyed by connection id

pub mod body;
pub mod buffer;
pub mod call;
pub mod connection;
pub mod decoder;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod outbound;
pub mod session;

pub use body::{build_body, FormData, FormPart, OutboundBody};
pub use call::{build_call_options, target_url, CallOptions};
pub use connection::{Connection, ConnectionId, ConnectionState};
pub use decoder::{decode, DecodedResponse};
pub use descriptor::{
    Beacon, ErrorDescription, FileSource, Outcome, RequestDescriptor, ResponseBody,
    ResponseEnvelope,
};
pub use error::{RelayError, RelayResult};
pub use orchestrator::{relay, PendingConnection, RelayClient};
pub use outbound::{Dispatch, HttpDispatcher};
pub use session::{Session, SessionRegistry};
