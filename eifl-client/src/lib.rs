//! EIFL HTTP Client
//!
//! A type-safe HTTP client for the EIFL server's runner protocol. Runners
//! use it to poll for jobs, stream step output, and report completion;
//! every request carries the runner's bearer token.
//!
//! # Example
//!
//! ```no_run
//! use eifl_client::ServerClient;
//!
//! # async fn example() -> eifl_client::Result<()> {
//! let client = ServerClient::new("http://localhost:8080", "my-runner-token");
//!
//! if let Some(job) = client.poll_job().await? {
//!     println!("Got run {}", job.run.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
mod runner;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use eifl_core::dto::job::{BaselineCheck, JobPayload};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the EIFL server runner protocol
#[derive(Debug, Clone)]
pub struct ServerClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// Runner bearer token
    token: String,
    /// HTTP client instance
    client: Client,
}

impl ServerClient {
    /// Create a new server client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Create a new server client with a custom HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        token: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ServerClient::new("http://localhost:8080", "tok");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ServerClient::new("http://localhost:8080/", "tok");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
