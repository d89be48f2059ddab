#![allow(dead_code)] // each test binary uses a different subset

//! Shared fixtures for server integration tests
//!
//! Tests run against an in-memory SQLite database (one connection, so
//! every query sees the same database) and a stub Git adapter seeded with
//! fixed branch heads and manifest files.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use eifl_core::domain::project::Project;
use eifl_core::domain::repo::Repo;
use eifl_core::domain::runner::Runner;
use eifl_core::dto::project::CreateRepo;
use eifl_core::dto::runner::RegisterRunner;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use uuid::Uuid;

use eifl_server::config::ServerConfig;
use eifl_server::crypto::SecretCipherHandle;
use eifl_server::git::{GitAdapter, GitError};
use eifl_server::repository::{pipeline_repository, project_repository, repo_repository};
use eifl_server::service::runner_service;
use eifl_server::{db, AppState};

pub const TEST_KEY: &str = "integration-test-encryption-key!";

/// Git adapter answering from in-memory maps
#[derive(Default)]
pub struct StubGit {
    /// (repo_path, branch) -> head sha
    pub heads: HashMap<(String, String), String>,
    /// (repo_path, rev, file) -> contents
    pub files: HashMap<(String, String, String), Vec<u8>>,
}

impl StubGit {
    pub fn with_head(mut self, repo_path: &str, branch: &str, sha: &str) -> Self {
        self.heads
            .insert((repo_path.to_string(), branch.to_string()), sha.to_string());
        self
    }

    pub fn with_file(mut self, repo_path: &str, rev: &str, file: &str, contents: &str) -> Self {
        self.files.insert(
            (repo_path.to_string(), rev.to_string(), file.to_string()),
            contents.as_bytes().to_vec(),
        );
        self
    }
}

#[async_trait]
impl GitAdapter for StubGit {
    async fn read_file_at_ref(
        &self,
        repo_path: &str,
        rev: &str,
        file: &str,
    ) -> Result<Option<Vec<u8>>, GitError> {
        Ok(self
            .files
            .get(&(repo_path.to_string(), rev.to_string(), file.to_string()))
            .cloned())
    }

    async fn resolve_head(
        &self,
        repo_path: &str,
        branch: &str,
    ) -> Result<Option<String>, GitError> {
        Ok(self
            .heads
            .get(&(repo_path.to_string(), branch.to_string()))
            .cloned())
    }
}

/// Fresh state over an in-memory database
pub async fn test_state(git: StubGit) -> AppState {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("connect options")
        .foreign_keys(true);

    // One connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("connect");

    db::run_migrations(&pool).await.expect("migrations");

    AppState::new(
        pool,
        Arc::new(git),
        Arc::new(SecretCipherHandle::with_key(Some(TEST_KEY.to_string()))),
        ServerConfig::default(),
    )
}

/// Seed a project and a hosted repo at `path`
pub async fn seed_repo(state: &AppState, path: &str) -> (Project, Repo) {
    let project = project_repository::create(&state.pool, &format!("proj-{}", Uuid::new_v4()), None)
        .await
        .expect("project");

    let repo = repo_repository::create(
        &state.pool,
        project.id,
        &CreateRepo {
            name: "app".to_string(),
            path: path.to_string(),
            remote_url: None,
            default_branch: "main".to_string(),
        },
    )
    .await
    .expect("repo");

    (project, repo)
}

/// Seed a pipeline from a manifest JSON string
pub async fn seed_pipeline(
    state: &AppState,
    repo_id: Uuid,
    config: &str,
    next_run_at: Option<chrono::DateTime<chrono::Utc>>,
) -> eifl_core::domain::pipeline::Pipeline {
    let name = eifl_core::manifest::parse_manifest(config)
        .expect("valid manifest")
        .name;

    pipeline_repository::create(&state.pool, repo_id, &name, config, next_run_at)
        .await
        .expect("pipeline")
}

/// Register a runner and return it with its token applied
pub async fn seed_runner(
    state: &AppState,
    name: &str,
    tags: &[&str],
    max_concurrency: i64,
) -> Runner {
    let registered = runner_service::register_runner(
        &state.pool,
        &RegisterRunner {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            max_concurrency,
        },
    )
    .await
    .expect("runner");

    registered.runner
}

/// Minimal manifest with the given extras spliced in
pub fn manifest(name: &str, extras: &str) -> String {
    let extras = if extras.is_empty() {
        String::new()
    } else {
        format!(", {}", extras)
    };

    format!(
        r#"{{ "name": "{}", "steps": [ {{ "name": "test", "run": "make test" }} ]{} }}"#,
        name, extras
    )
}
