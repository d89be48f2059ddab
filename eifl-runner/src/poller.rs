//! Job poller
//!
//! Polls the server for dispatched jobs and executes them. Each job runs
//! in its own task; the server's concurrency accounting decides how many
//! jobs this runner holds at once.

use std::sync::Arc;

use anyhow::{Context, Result};
use eifl_client::ServerClient;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::execution::JobExecutor;

/// Job poller that continuously polls for and executes jobs
pub struct JobPoller {
    config: Config,
    client: Arc<ServerClient>,
}

impl JobPoller {
    /// Creates a new job poller
    pub fn new(config: Config, client: Arc<ServerClient>) -> Self {
        Self { config, client }
    }

    /// Starts the polling loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting job poller (interval: {:?})",
            self.config.poll_interval
        );

        let _heartbeat_handle = self.start_heartbeat_loop();

        let mut interval = time::interval(self.config.poll_interval);

        loop {
            interval.tick().await;

            debug!("Polling for work");

            match self.poll_once().await {
                Ok(true) => info!("Job accepted this cycle"),
                Ok(false) => {}
                Err(e) => error!("Error during poll cycle: {:#}", e),
            }
        }
    }

    /// Performs a single poll cycle
    async fn poll_once(&self) -> Result<bool> {
        let job = self
            .client
            .poll_job()
            .await
            .context("Failed to poll for a job")?;

        let job = match job {
            Some(job) => job,
            None => {
                debug!("No job available");
                return Ok(false);
            }
        };

        let executor = JobExecutor::new(self.config.clone(), Arc::clone(&self.client));
        let run_id = job.run.id;

        tokio::spawn(async move {
            if let Err(e) = executor.execute(job).await {
                error!("Failed to execute run {}: {:#}", run_id, e);
            }
        });

        Ok(true)
    }

    /// Starts a background task to send heartbeats
    fn start_heartbeat_loop(&self) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let heartbeat_interval = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = time::interval(heartbeat_interval);

            loop {
                ticker.tick().await;

                debug!("Sending heartbeat");

                if let Err(e) = client.heartbeat().await {
                    warn!("Failed to send heartbeat: {:#}", e);
                }
            }
        })
    }
}
