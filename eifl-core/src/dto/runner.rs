//! Runner registration DTOs

use serde::{Deserialize, Serialize};

use crate::domain::runner::Runner;

/// Request to register a runner with the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRunner {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: i64,
}

fn default_concurrency() -> i64 {
    1
}

/// Registration response
///
/// The only place the minted bearer token ever leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredRunner {
    #[serde(flatten)]
    pub runner: Runner,
    pub token: String,
}
