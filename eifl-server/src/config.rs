//! Server configuration
//!
//! All settings come from the environment, with defaults suitable for a
//! single-node deployment.

use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    pub bind_addr: String,

    /// sqlx connection URL for the SQLite database
    pub database_url: String,

    /// Root directory of hosted bare repositories
    pub data_dir: PathBuf,

    /// How often the scheduler tick runs
    pub scheduler_interval: Duration,

    /// Runners without a heartbeat for this long are marked offline
    pub runner_stale_after: Duration,

    /// Externally reachable base URL, used for status callback links
    pub public_url: Option<String>,

    /// Token injected into github.com clone URLs at dispatch
    pub github_token: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// - `EIFL_BIND_ADDR` (default `0.0.0.0:8080`)
    /// - `EIFL_DATABASE_URL` (default `sqlite://eifl.db?mode=rwc`)
    /// - `EIFL_DATA_DIR` (default `./data/repos`)
    /// - `EIFL_SCHEDULER_INTERVAL_SECS` (default 60)
    /// - `EIFL_RUNNER_STALE_SECS` (default 120)
    /// - `EIFL_PUBLIC_URL` (optional)
    /// - `GITHUB_TOKEN` (optional)
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("EIFL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let database_url = std::env::var("EIFL_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://eifl.db?mode=rwc".to_string());

        let data_dir = std::env::var("EIFL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/repos"));

        let scheduler_interval = std::env::var("EIFL_SCHEDULER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        let runner_stale_after = std::env::var("EIFL_RUNNER_STALE_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(120));

        let public_url = std::env::var("EIFL_PUBLIC_URL").ok();
        let github_token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        Self {
            bind_addr,
            database_url,
            data_dir,
            scheduler_interval,
            runner_stale_after,
            public_url,
            github_token,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: "sqlite://eifl.db?mode=rwc".to_string(),
            data_dir: PathBuf::from("./data/repos"),
            scheduler_interval: Duration::from_secs(60),
            runner_stale_after: Duration::from_secs(120),
            public_url: None,
            github_token: None,
        }
    }
}
