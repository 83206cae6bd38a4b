//! Feed refresh bridge
//!
//! Looks up gateways and feeds on the management server, then listens on an
//! SQS queue. A message whose body names a known feed triggers a refresh of
//! that feed on every gateway.

mod config;
mod orchestrator;
mod startup;

use anyhow::Context;
use mgmt_api::MgmtClient;
use queue_listener::{Listener, SqsQueue};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::orchestrator::FeedOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedman=info,mgmt_api=info,queue_listener=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let client = MgmtClient::new(config.mgmt()).context("Failed to create management API client")?;
    tracing::info!("Using management API at {}", client.base_url());

    // Ctrl-C stops the listener and any task wait in progress
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Shutdown requested");
        shutdown.cancel();
    });

    let catalog = startup::run(&client, &config, &cancel).await?;

    let mut orchestrator = FeedOrchestrator::new(client, catalog).with_cancel(cancel.clone());
    if config.wait_for_kick {
        orchestrator = orchestrator.wait_for_kicks(config.poll_options());
    }

    let queue = SqsQueue::connect(config.queue_url.clone(), config.queue_wait).await;
    let listener = Listener::with_config(queue, config.listener());
    listener.listen(&orchestrator, &cancel).await;

    Ok(())
}
