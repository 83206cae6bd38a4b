//! Startup phase: catalog lookup and the optional catalog report
//!
//! Failures here stop the process. The queue phase must not run against an
//! incomplete catalog.

use anyhow::Context;
use mgmt_api::{MgmtClient, PollOptions, PollOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

/// Gateway and feed names captured once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub gateways: Vec<String>,
    pub feeds: Vec<String>,
}

impl Catalog {
    /// Fetch both name lists from the management API
    pub async fn load(client: &MgmtClient) -> mgmt_api::Result<Self> {
        let gateways = client.list_gateway_names().await?;
        let feeds = client.list_feed_names().await?;
        info!("Found {} gateway(s): {:?}", gateways.len(), gateways);
        info!("Found {} feed(s): {:?}", feeds.len(), feeds);
        Ok(Self { gateways, feeds })
    }

    /// Find the feed named exactly `name`
    pub fn feed(&self, name: &str) -> Option<&str> {
        self.feeds.iter().map(String::as_str).find(|f| *f == name)
    }
}

/// Load the catalog, run the catalog report if enabled, then log out
pub async fn run(
    client: &MgmtClient,
    config: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<Catalog> {
    if !config.notified_gateways.is_empty() {
        warn!(
            "Notified gateway list {:?} is configured but not applied; kicks target every gateway",
            config.notified_gateways
        );
    }

    let catalog = Catalog::load(client)
        .await
        .context("Failed to load gateway and feed catalog")?;

    if config.startup_report {
        report_catalog(client, &catalog.gateways, &config.poll_options(), cancel).await?;
    }

    // The queue phase logs in again on first use
    if let Err(e) = client.logout().await {
        warn!("Continuing after failed logout: {}", e);
    }

    Ok(catalog)
}

/// Ask every gateway which feeds it knows and log the answers
async fn report_catalog(
    client: &MgmtClient,
    gateways: &[String],
    options: &PollOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    info!("Running catalog report on {} gateway(s)", gateways.len());

    let response = client
        .report_catalog(gateways)
        .await
        .context("Failed to start catalog report")?;
    let outcome = client
        .poll_until_done(&response.task_ids(), options, cancel)
        .await
        .context("Failed to poll catalog report tasks")?;

    log_outcome("Catalog report", &outcome);
    Ok(())
}

/// Log what a polling round ended with, including decoded task output
pub fn log_outcome(what: &str, outcome: &PollOutcome) {
    for (task_id, message) in outcome.messages() {
        info!(task_id = %task_id, "{} output:\n{}", what, message);
    }

    if outcome.cancelled {
        info!("{} wait cancelled", what);
    } else if outcome.timed_out {
        warn!(
            "{} did not finish in time, abandoned task(s): {:?}",
            what, outcome.unfinished_ids
        );
    } else {
        info!(
            "{} finished: {} succeeded, {} did not",
            what,
            outcome.finished.len(),
            outcome.non_success_count()
        );
    }
}
