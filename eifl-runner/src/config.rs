//! Runner configuration
//!
//! Defines all configurable parameters for the runner including polling
//! intervals and the server connection settings.

use std::path::PathBuf;
use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server base URL (e.g., "http://localhost:8080")
    pub server_url: String,

    /// Bearer token issued at registration
    pub token: String,

    /// How often to poll the server for work
    pub poll_interval: Duration,

    /// How often to send heartbeats
    pub heartbeat_interval: Duration,

    /// Where job workspaces are cloned
    pub workspace_dir: PathBuf,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - EIFL_SERVER_URL (required)
    /// - EIFL_RUNNER_TOKEN (required)
    /// - EIFL_POLL_INTERVAL (optional, seconds, default: 5)
    /// - EIFL_HEARTBEAT_INTERVAL (optional, seconds, default: 30)
    /// - EIFL_WORKSPACE_DIR (optional, default: ./workspace)
    pub fn from_env() -> anyhow::Result<Self> {
        let server_url = std::env::var("EIFL_SERVER_URL")
            .map_err(|_| anyhow::anyhow!("EIFL_SERVER_URL environment variable not set"))?;

        let token = std::env::var("EIFL_RUNNER_TOKEN")
            .map_err(|_| anyhow::anyhow!("EIFL_RUNNER_TOKEN environment variable not set"))?;

        let poll_interval = std::env::var("EIFL_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        let heartbeat_interval = std::env::var("EIFL_HEARTBEAT_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let workspace_dir = std::env::var("EIFL_WORKSPACE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./workspace"));

        Ok(Self {
            server_url,
            token,
            poll_interval,
            heartbeat_interval,
            workspace_dir,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token.is_empty() {
            anyhow::bail!("runner token cannot be empty");
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            anyhow::bail!("server_url must start with http:// or https://");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server_url: "http://localhost:8080".to_string(),
            token: "tok".to_string(),
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            workspace_dir: PathBuf::from("./workspace"),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad = config();
        bad.token = String::new();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.server_url = "not-a-url".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.poll_interval = Duration::from_secs(0);
        assert!(bad.validate().is_err());
    }
}
