//! Message types for the transport fabric

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message that flows through the transport
///
/// Protocol fields travel in string headers; bulk payloads (the artifact
/// preview on a proposal) travel in the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message body (bulk payload, may be empty)
    pub body: Vec<u8>,

    /// Headers for protocol metadata
    pub headers: HashMap<String, String>,
}

impl Message {
    /// Create a new message with body and headers
    pub fn new(body: Vec<u8>, headers: HashMap<String, String>) -> Self {
        Self { body, headers }
    }

    /// Create a message with just headers
    pub fn with_headers(headers: HashMap<String, String>) -> Self {
        Self {
            body: Vec::new(),
            headers,
        }
    }

    /// Add a header to the message
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Get header value
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|s| s.as_str())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::with_headers(HashMap::new())
    }
}

/// An inbound message together with its sender's node name
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: String,
    pub message: Message,
}
