//! Queue consumer
//!
//! Receives one message at a time, hands it to a [`MessageHandler`] and
//! acknowledges it afterwards. [`SqsQueue`] is the production backend.

mod error;
mod listener;
mod message;
mod sqs;

pub use error::{QueueError, Result};
pub use listener::{Listener, ListenerConfig, MessageHandler, PollResult, QueueClient};
pub use message::{QueueMessage, SENT_TIMESTAMP};
pub use sqs::{SqsQueue, MAX_WAIT_SECS};
