//! Amazon SQS backend
//!
//! Credentials and region come from the standard AWS environment.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use tracing::info;

use crate::error::{QueueError, Result};
use crate::listener::QueueClient;
use crate::message::{QueueMessage, SENT_TIMESTAMP};

/// Longest long-poll wait SQS accepts
pub const MAX_WAIT_SECS: u64 = 20;

/// SQS queue addressed by URL
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    wait_time: Duration,
}

impl SqsQueue {
    /// Connect using the default AWS configuration chain
    pub async fn connect(queue_url: impl Into<String>, wait_time: Duration) -> Self {
        let shared_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let queue_url = queue_url.into();
        info!("SQS client initialized for queue {}", queue_url);
        Self::with_client(Client::new(&shared_config), queue_url, wait_time)
    }

    /// Wrap an existing SDK client
    pub fn with_client(client: Client, queue_url: impl Into<String>, wait_time: Duration) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            wait_time: wait_time.min(Duration::from_secs(MAX_WAIT_SECS)),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn receive(&self) -> Result<Vec<QueueMessage>> {
        let wait_secs = i32::try_from(self.wait_time.as_secs()).unwrap_or(MAX_WAIT_SECS as i32);

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_secs)
            .message_system_attribute_names(MessageSystemAttributeName::SentTimestamp)
            .send()
            .await
            .map_err(|e| QueueError::receive(DisplayErrorContext(e).to_string()))?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(into_queue_message)
            .collect())
    }

    async fn delete(&self, message: &QueueMessage) -> Result<()> {
        let receipt_handle =
            message
                .receipt_handle
                .as_deref()
                .ok_or_else(|| QueueError::MissingReceiptHandle {
                    message_id: message.display_id().to_string(),
                })?;

        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::delete(message.display_id(), DisplayErrorContext(e).to_string()))?;

        Ok(())
    }
}

fn into_queue_message(message: Message) -> QueueMessage {
    let attributes = message
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();

    QueueMessage {
        message_id: message.message_id,
        body: message.body,
        receipt_handle: message.receipt_handle,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_message_conversion() {
        let sdk_message = Message::builder()
            .message_id("m-1")
            .body("feedA")
            .receipt_handle("rh-1")
            .attributes(MessageSystemAttributeName::SentTimestamp, "1718000000000")
            .build();

        let msg = into_queue_message(sdk_message);
        assert_eq!(msg.message_id.as_deref(), Some("m-1"));
        assert_eq!(msg.body.as_deref(), Some("feedA"));
        assert_eq!(msg.receipt_handle.as_deref(), Some("rh-1"));
        assert_eq!(msg.attributes.get(SENT_TIMESTAMP).map(String::as_str), Some("1718000000000"));
    }

    #[test]
    fn test_sdk_message_without_fields() {
        let msg = into_queue_message(Message::builder().build());
        assert_eq!(msg, QueueMessage::default());
    }
}
