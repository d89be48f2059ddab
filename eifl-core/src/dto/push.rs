//! Push ingress DTOs
//!
//! The Git transport reports each successful receive-pack to the server as
//! a batch of ref updates; the push trigger walks them.

use serde::{Deserialize, Serialize};

pub const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

/// One updated ref from a receive-pack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefUpdate {
    pub oldrev: String,
    pub newrev: String,
    pub refname: String,
}

impl RefUpdate {
    /// The branch name, when this update targets a branch head
    pub fn branch(&self) -> Option<&str> {
        self.refname.strip_prefix("refs/heads/")
    }

    /// Whether the update deletes the ref
    pub fn is_deletion(&self) -> bool {
        self.newrev == ZERO_SHA
    }
}

/// Body of `POST /hooks/push`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    /// Repo path relative to the server data directory
    pub repo_path: String,
    pub updates: Vec<RefUpdate>,
}
