//! EIFL Runner
//!
//! A stateless worker that executes pipeline runs dispatched by the EIFL
//! server.
//!
//! Architecture:
//! - Configuration: settings from environment variables
//! - Poller: polls the server for dispatched jobs, sends heartbeats
//! - Executor: clones the repo, runs shell steps, streams output, and
//!   reports metrics and completion
//!
//! The runner authenticates every request with the bearer token it was
//! issued at registration.

mod config;
mod execution;
mod poller;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::poller::JobPoller;
use eifl_client::ServerClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eifl_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EIFL runner");

    let config = Config::from_env()?;
    config.validate()?;

    info!("Server: {}", config.server_url);

    let client = Arc::new(ServerClient::new(
        config.server_url.clone(),
        config.token.clone(),
    ));

    let poller = JobPoller::new(config, client);

    info!("Runner initialized successfully");

    if let Err(e) = poller.run().await {
        error!("Poller error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
