//! Queue message model

use std::collections::HashMap;

/// Attribute holding the send time in epoch milliseconds
pub const SENT_TIMESTAMP: &str = "SentTimestamp";

/// A message received from the queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueMessage {
    /// Service-assigned id, used for logging
    pub message_id: Option<String>,
    /// Plain-text body
    pub body: Option<String>,
    /// Opaque token needed to delete the message
    pub receipt_handle: Option<String>,
    /// Delivery metadata (system attributes)
    pub attributes: HashMap<String, String>,
}

impl QueueMessage {
    /// Create a message with a body and receipt handle
    pub fn new(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            receipt_handle: Some(receipt_handle.into()),
            ..Default::default()
        }
    }

    /// Set the message id
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Add a delivery attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Message id for log lines
    pub fn display_id(&self) -> &str {
        self.message_id.as_deref().unwrap_or("<unknown>")
    }

    /// Send time in epoch milliseconds, when the service reported it
    pub fn sent_timestamp_ms(&self) -> Option<u64> {
        self.attributes.get(SENT_TIMESTAMP)?.parse().ok()
    }
}
