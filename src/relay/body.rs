//! Outbound body construction.
//!
//! # Responsibilities
//! - Suppress bodies for GET/HEAD
//! - Rebuild multipart forms from body fields and in-memory file buffers
//! - Pass any other body through untouched
//!
//! # Design Decisions
//! - The form is an owned list of parts so it can be inspected before it is
//!   turned into a `reqwest` form at dispatch time
//! - Body fields win over files on key collision
//! - File-shaped entries without bytes are dropped, not sent as text

use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use crate::relay::descriptor::{FileSource, RequestDescriptor};
use crate::relay::error::RelayResult;

/// Methods that never carry a body.
pub const SIMPLE_METHODS: [&str; 2] = ["GET", "HEAD"];

/// Content-type hint that triggers multipart reconstruction.
pub const MULTIPART_FORM: &str = "multipart/form-data";

/// Body of the outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    /// The descriptor's body, passed through verbatim.
    Raw(Value),
    /// A multipart form rebuilt from body fields and files.
    Multipart(FormData),
}

/// One multipart part.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mimetype: Option<String>,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Ordered multipart parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    parts: Vec<FormPart>,
}

impl FormData {
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn get(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|part| part.name() == name)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Convert into a `reqwest` multipart form.
    pub fn into_form(self) -> RelayResult<Form> {
        let mut form = Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    filename,
                    mimetype,
                    bytes,
                } => {
                    let mut file = Part::bytes(bytes).file_name(filename);
                    if let Some(mimetype) = mimetype {
                        file = file.mime_str(&mimetype)?;
                    }
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

pub fn is_simple_method(method: Option<&str>) -> bool {
    method.is_some_and(|m| SIMPLE_METHODS.iter().any(|s| s.eq_ignore_ascii_case(m.trim())))
}

pub fn is_multipart(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|t| {
        let t = t.trim();
        t.len() >= MULTIPART_FORM.len()
            && t.is_char_boundary(MULTIPART_FORM.len())
            && t[..MULTIPART_FORM.len()].eq_ignore_ascii_case(MULTIPART_FORM)
    })
}

/// Build the outbound body for a descriptor.
pub fn build_body(descriptor: &RequestDescriptor) -> Option<OutboundBody> {
    if is_simple_method(descriptor.method.as_deref()) {
        return None;
    }

    if is_multipart(descriptor.content_type.as_deref()) {
        match (&descriptor.files, &descriptor.body) {
            (None, None) => return None,
            // a pre-encoded payload keeps its own boundary
            (None, Some(body)) if !body.is_object() => {
                return Some(OutboundBody::Raw(body.clone()));
            }
            _ => {}
        }
        let form = build_form(descriptor.files.as_ref(), descriptor.body.as_ref());
        return Some(OutboundBody::Multipart(form));
    }

    descriptor.body.clone().map(OutboundBody::Raw)
}

fn build_form(files: Option<&Map<String, Value>>, body: Option<&Value>) -> FormData {
    let mut merged = files.cloned().unwrap_or_default();
    if let Some(Value::Object(fields)) = body {
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
    }

    let mut parts = Vec::with_capacity(merged.len());
    for (name, value) in merged {
        if let Some(file) = FileSource::from_value(&value) {
            parts.push(FormPart::File {
                filename: file.original_filename.unwrap_or_else(|| name.clone()),
                name,
                mimetype: file.mimetype,
                bytes: file.buffer,
            });
        } else if FileSource::is_file_shaped(&value) {
            tracing::debug!(field = %name, "Dropping attachment without bytes");
        } else {
            parts.push(FormPart::Text {
                value: field_text(&value),
                name,
            });
        }
    }

    FormData { parts }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
