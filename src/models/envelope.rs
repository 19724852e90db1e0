//! Retry-aware message envelope
//!
//! An [`Envelope`] is built once when a delivery arrives and threaded through
//! the pipeline by value. It carries the raw body, the attempt counter read
//! from the message headers and the remaining headers, so a retry can
//! republish the exact same message with only the counter changed.

use lapin::types::FieldTable;
use serde_json::{Map, Value};

use crate::amqp::headers;

use super::error::{ValidationError, ValidationErrorKind, ValidationResult};

/// Broker token for one delivery attempt
///
/// Not `Clone`: acknowledging or rejecting consumes the handle, so a
/// delivery can be settled exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct DeliveryHandle {
    tag: u64,
}

impl DeliveryHandle {
    /// Wrap a broker delivery tag
    pub fn new(tag: u64) -> Self {
        Self { tag }
    }

    /// The underlying delivery tag
    pub fn tag(&self) -> u64 {
        self.tag
    }
}

/// A message body plus its retry state
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    body: Vec<u8>,
    attempt_count: u32,
    headers: FieldTable,
}

impl Envelope {
    /// Build an envelope from a received body and its headers
    pub fn from_parts(body: Vec<u8>, headers: Option<&FieldTable>) -> Self {
        let headers = headers.cloned().unwrap_or_default();
        let attempt_count = headers::read_attempt_count(&headers);

        Self {
            body,
            attempt_count,
            headers,
        }
    }

    /// Build a first-delivery envelope around a JSON value
    pub fn from_json(payload: &Value) -> Self {
        Self {
            body: payload.to_string().into_bytes(),
            attempt_count: 0,
            headers: FieldTable::default(),
        }
    }

    /// Override the attempt counter (as if the header carried it)
    pub fn with_attempt_count(mut self, attempt_count: u32) -> Self {
        self.attempt_count = attempt_count;
        self
    }

    /// Raw message body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of manual republishes this message has been through
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Headers to publish with, including the current attempt counter
    pub fn headers(&self) -> FieldTable {
        headers::with_attempt_count(self.headers.clone(), self.attempt_count)
    }

    /// The envelope to republish for the next retry
    pub fn next_attempt(&self) -> Self {
        Self {
            body: self.body.clone(),
            attempt_count: self.attempt_count.saturating_add(1),
            headers: self.headers.clone(),
        }
    }

    /// Parse the body as a JSON object
    pub fn decode_payload(&self) -> ValidationResult<Map<String, Value>> {
        let text = std::str::from_utf8(&self.body).map_err(|e| {
            ValidationError::with_context(ValidationErrorKind::InvalidEncoding, "body", e.to_string())
        })?;

        let value: Value = serde_json::from_str(text).map_err(|e| {
            ValidationError::with_context(ValidationErrorKind::InvalidJson, "body", e.to_string())
        })?;

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(ValidationError::new(ValidationErrorKind::NotAnObject, "body")),
        }
    }
}
