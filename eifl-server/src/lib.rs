//! EIFL Server
//!
//! The CI server: hosts pipeline state, reacts to Git pushes, evaluates
//! cron schedules, and dispatches pending runs to polling runners.

pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod git;
pub mod repository;
pub mod service;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::crypto::SecretCipherHandle;
use crate::git::GitAdapter;

/// Shared state handed to every request handler and background task
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub git: Arc<dyn GitAdapter>,
    pub secrets: Arc<SecretCipherHandle>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        git: Arc<dyn GitAdapter>,
        secrets: Arc<SecretCipherHandle>,
        config: ServerConfig,
    ) -> Self {
        Self {
            pool,
            git,
            secrets,
            config: Arc::new(config),
        }
    }
}
