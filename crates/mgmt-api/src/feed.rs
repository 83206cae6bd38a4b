//! Feed refresh ("kick") scripts

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::MgmtClient;
use crate::error::Result;
use crate::poller::{PollOptions, PollOutcome};
use crate::script::RunScriptResponse;

/// Gateway-local log that every kick appends to
pub const KICK_LOG: &str = "/var/log/kicked.log";

/// Script listing the feeds known to each gateway
pub const CATALOG_REPORT_SCRIPT: &str =
    r"(date; hostname; dynamic_objects -efo_show | grep -Po '^object name : \K.*') | tee -a /var/log/cpfeedman.log";
/// Script name used for the catalog report
pub const CATALOG_REPORT_NAME: &str = "log date";

/// Build the script that refreshes `feed` on a gateway
///
/// It logs a marker line, the current date and the feed name to
/// [`KICK_LOG`], then asks the gateway to update the feed.
pub fn kick_script(feed: &str) -> String {
    format!(
        "(echo '---'; date; echo \"{feed}\" ; dynamic_objects -efo_update \"{feed}\" ) | tee -a {log}",
        feed = feed,
        log = KICK_LOG
    )
}

/// Script name shown in the management server's task list
pub fn kick_script_name(feed: &str) -> String {
    format!("kick feed {}", feed)
}

/// Operations the orchestrator needs to kick feeds
#[async_trait]
pub trait FeedKicker: Send + Sync {
    /// Trigger a refresh of `feed` on every target
    async fn kick_feed(&self, feed: &str, targets: &[String]) -> Result<RunScriptResponse>;

    /// Wait for tasks created by a kick
    async fn wait_for_tasks(
        &self,
        task_ids: &[String],
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome>;
}

impl MgmtClient {
    /// Trigger a refresh of `feed` on every target
    ///
    /// Returns as soon as the script is submitted; callers decide whether to
    /// wait for the resulting tasks.
    pub async fn kick_feed(&self, feed: &str, targets: &[String]) -> Result<RunScriptResponse> {
        self.run_script(&kick_script(feed), &kick_script_name(feed), targets)
            .await
    }

    /// Run the feed catalog report on every target
    pub async fn report_catalog(&self, targets: &[String]) -> Result<RunScriptResponse> {
        self.run_script(CATALOG_REPORT_SCRIPT, CATALOG_REPORT_NAME, targets)
            .await
    }
}

#[async_trait]
impl FeedKicker for MgmtClient {
    async fn kick_feed(&self, feed: &str, targets: &[String]) -> Result<RunScriptResponse> {
        MgmtClient::kick_feed(self, feed, targets).await
    }

    async fn wait_for_tasks(
        &self,
        task_ids: &[String],
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        self.poll_until_done(task_ids, options, cancel).await
    }
}
