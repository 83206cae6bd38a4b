//! Single-message consumer loop
//!
//! Each iteration receives at most one message, hands it to the handler and
//! then deletes it, whatever the handler did with it. Receive failures are
//! logged and retried after a fixed backoff; nothing escapes [`Listener::listen`].

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::message::QueueMessage;

/// Queue operations the listener needs
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive at most one message, waiting up to the backend's long-poll limit
    async fn receive(&self) -> Result<Vec<QueueMessage>>;

    /// Acknowledge a message so it is not redelivered
    async fn delete(&self, message: &QueueMessage) -> Result<()>;
}

/// Receives every delivered message
///
/// Handlers own their failures: the message is deleted after `handle`
/// returns no matter what happened inside.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &QueueMessage);
}

/// Listener settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Sleep after a failed receive
    pub error_backoff: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// What one iteration of the loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// Nothing was waiting
    Empty,
    /// Messages went to the handler; `deleted` of them were acknowledged
    Delivered { delivered: usize, deleted: usize },
    /// The receive call failed
    ReceiveFailed,
}

/// Consumer loop over a [`QueueClient`]
pub struct Listener<Q> {
    queue: Q,
    config: ListenerConfig,
}

impl<Q: QueueClient> Listener<Q> {
    pub fn new(queue: Q) -> Self {
        Self::with_config(queue, ListenerConfig::default())
    }

    pub fn with_config(queue: Q, config: ListenerConfig) -> Self {
        Self { queue, config }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Run a single receive/deliver/delete iteration
    pub async fn poll_once<H>(&self, handler: &H) -> PollResult
    where
        H: MessageHandler + ?Sized,
    {
        let received = self.queue.receive().await;
        self.dispatch(received, handler).await
    }

    /// Consume messages until `cancel` fires
    ///
    /// Cancellation interrupts a pending receive or backoff sleep. A message
    /// already handed to the handler is still deleted before the loop exits.
    pub async fn listen<H>(&self, handler: &H, cancel: &CancellationToken)
    where
        H: MessageHandler + ?Sized,
    {
        info!("Listening for queue messages");

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.queue.receive() => received,
            };

            if self.dispatch(received, handler).await == PollResult::ReceiveFailed {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.error_backoff) => {}
                }
            }
        }

        info!("Queue listener stopped");
    }

    async fn dispatch<H>(&self, received: Result<Vec<QueueMessage>>, handler: &H) -> PollResult
    where
        H: MessageHandler + ?Sized,
    {
        let messages = match received {
            Ok(messages) => messages,
            Err(e) => {
                error!("Failed to receive messages: {}", e);
                return PollResult::ReceiveFailed;
            }
        };

        if messages.is_empty() {
            debug!("No messages received");
            return PollResult::Empty;
        }

        let delivered = messages.len();
        let mut deleted = 0;
        for message in &messages {
            info!(
                message_id = message.display_id(),
                sent_timestamp = ?message.sent_timestamp_ms(),
                "Received message"
            );

            handler.handle(message).await;

            match self.queue.delete(message).await {
                Ok(()) => {
                    debug!("Deleted message {}", message.display_id());
                    deleted += 1;
                }
                Err(e) => warn!("Failed to delete message: {}", e),
            }
        }

        PollResult::Delivered { delivered, deleted }
    }
}
