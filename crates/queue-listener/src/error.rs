//! Error types for queue operations

use thiserror::Error;

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors that can occur while talking to the queue service
#[derive(Debug, Error)]
pub enum QueueError {
    /// Receiving from the queue failed
    #[error("Failed to receive from queue: {message}")]
    Receive { message: String },

    /// Deleting a message failed
    #[error("Failed to delete message {message_id}: {message}")]
    Delete { message_id: String, message: String },

    /// The message cannot be acknowledged
    #[error("Message {message_id} has no receipt handle")]
    MissingReceiptHandle { message_id: String },
}

impl QueueError {
    /// Create a Receive error
    pub fn receive(message: impl Into<String>) -> Self {
        Self::Receive {
            message: message.into(),
        }
    }

    /// Create a Delete error
    pub fn delete(message_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delete {
            message_id: message_id.into(),
            message: message.into(),
        }
    }
}
