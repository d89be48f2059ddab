//! Git adapter
//!
//! Read-only access to the hosted bare repositories. The smart-HTTP
//! transport owns all mutation; the core only resolves branch heads and
//! reads files at a revision, and treats each adapter call as atomic.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Git adapter errors
///
/// Missing branches and missing files are `Ok(None)`, not errors; this
/// only covers failures to run git at all.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to invoke git: {0}")]
    Io(#[from] std::io::Error),
}

/// Read operations the core needs from a repository
#[async_trait]
pub trait GitAdapter: Send + Sync {
    /// Read a file's contents at a revision, or None if absent
    async fn read_file_at_ref(
        &self,
        repo_path: &str,
        rev: &str,
        file: &str,
    ) -> Result<Option<Vec<u8>>, GitError>;

    /// Resolve a branch head to a commit SHA, or None if the branch
    /// does not exist
    async fn resolve_head(&self, repo_path: &str, branch: &str)
        -> Result<Option<String>, GitError>;
}

/// Adapter shelling out to the `git` binary
///
/// `repo_path` values are relative to the server data directory, matching
/// how the transport addresses repositories.
pub struct CliGitAdapter {
    data_dir: PathBuf,
}

impl CliGitAdapter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn repo_dir(&self, repo_path: &str) -> PathBuf {
        self.data_dir.join(repo_path)
    }

    async fn git_output(dir: &Path, args: &[&str]) -> Result<Option<Vec<u8>>, GitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            tracing::debug!(
                "git {:?} in {} failed: {}",
                args,
                dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        Ok(Some(output.stdout))
    }
}

#[async_trait]
impl GitAdapter for CliGitAdapter {
    async fn read_file_at_ref(
        &self,
        repo_path: &str,
        rev: &str,
        file: &str,
    ) -> Result<Option<Vec<u8>>, GitError> {
        let spec = format!("{}:{}", rev, file);
        Self::git_output(&self.repo_dir(repo_path), &["show", &spec]).await
    }

    async fn resolve_head(
        &self,
        repo_path: &str,
        branch: &str,
    ) -> Result<Option<String>, GitError> {
        let refname = format!("refs/heads/{}", branch);
        let stdout =
            Self::git_output(&self.repo_dir(repo_path), &["rev-parse", "--verify", &refname])
                .await?;

        Ok(stdout.and_then(|bytes| {
            let sha = String::from_utf8_lossy(&bytes).trim().to_string();
            if sha.is_empty() {
                None
            } else {
                Some(sha)
            }
        }))
    }
}
