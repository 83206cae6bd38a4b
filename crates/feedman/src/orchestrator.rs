//! Turns queue messages into feed kicks

use async_trait::async_trait;
use mgmt_api::{FeedKicker, PollOptions};
use queue_listener::{MessageHandler, QueueMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::startup::{log_outcome, Catalog};

/// Kicks a feed on every gateway when a message names it
pub struct FeedOrchestrator<K> {
    kicker: K,
    catalog: Catalog,
    /// Poll kick tasks to completion with these options; `None` to fire and forget
    wait: Option<PollOptions>,
    cancel: CancellationToken,
}

impl<K: FeedKicker> FeedOrchestrator<K> {
    pub fn new(kicker: K, catalog: Catalog) -> Self {
        Self {
            kicker,
            catalog,
            wait: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Wait for each kick's tasks before taking the next message
    pub fn wait_for_kicks(mut self, options: PollOptions) -> Self {
        self.wait = Some(options);
        self
    }

    /// Token that aborts an in-flight wait
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn kick(&self, feed: &str) {
        let gateways = &self.catalog.gateways;
        info!("Kicking feed {} on {} gateway(s)", feed, gateways.len());

        let response = match self.kicker.kick_feed(feed, gateways).await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to kick feed {}: {}", feed, e);
                return;
            }
        };

        let task_ids = response.task_ids();
        info!("Feed {} kick submitted, task(s): {:?}", feed, task_ids);

        let Some(options) = &self.wait else {
            return;
        };
        match self
            .kicker
            .wait_for_tasks(&task_ids, options, &self.cancel)
            .await
        {
            Ok(outcome) => log_outcome(&format!("Kick of feed {}", feed), &outcome),
            Err(e) => error!("Failed to poll kick tasks for feed {}: {}", feed, e),
        }
    }
}

#[async_trait]
impl<K: FeedKicker> MessageHandler for FeedOrchestrator<K> {
    async fn handle(&self, message: &QueueMessage) {
        let Some(body) = message.body.as_deref() else {
            warn!("Message {} has no body, ignoring", message.display_id());
            return;
        };

        match self.catalog.feed(body) {
            Some(feed) => self.kick(feed).await,
            None => debug!("Message {} does not name a known feed: {:?}", message.display_id(), body),
        }
    }
}
