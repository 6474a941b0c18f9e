//! Outbound call assembly.

use std::collections::BTreeMap;

use crate::relay::body::{build_body, OutboundBody};
use crate::relay::descriptor::RequestDescriptor;

/// Method, headers and body of an outbound call. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    pub method: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<OutboundBody>,
}

/// Assemble the call for a descriptor.
pub fn build_call_options(descriptor: &RequestDescriptor) -> CallOptions {
    CallOptions {
        method: descriptor.method.clone(),
        headers: descriptor.headers.clone(),
        body: build_body(descriptor),
    }
}

/// `base ++ originalUrl ++ search`.
pub fn target_url(base: &str, descriptor: &RequestDescriptor) -> String {
    format!("{}{}", base, descriptor.path_and_query())
}
