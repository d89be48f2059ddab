//! Runner domain model
//!
//! Represents an external worker process that executes runs dispatched by
//! the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A runner that can execute runs
///
/// Authenticated by its opaque bearer `token`. `tags` constrain which
/// pipelines it may receive; `active_jobs` is maintained atomically by the
/// store and stays within `0..=max_concurrency` in steady state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    pub id: Uuid,
    pub name: String,

    /// Opaque bearer token. Never serialized back out; it is returned once
    /// at registration via the registration DTO.
    #[serde(skip_serializing, default)]
    pub token: String,

    pub status: RunnerStatus,
    pub tags: Vec<String>,
    pub max_concurrency: i64,
    pub active_jobs: i64,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Runner {
    /// Whether this runner carries every tag the manifest requires
    ///
    /// An empty requirement set matches any runner.
    pub fn satisfies_tags(&self, required: &[String]) -> bool {
        required.iter().all(|t| self.tags.contains(t))
    }

    pub fn at_capacity(&self) -> bool {
        self.active_jobs >= self.max_concurrency
    }
}

/// Status of a runner
///
/// `busy` means "at capacity right now": it is set when a dispatch brings
/// `active_jobs` up to `max_concurrency` and regresses to `online` as soon
/// as any single run completes. It is not a stable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    Online,
    Offline,
    Busy,
}

impl RunnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerStatus::Online => "online",
            RunnerStatus::Offline => "offline",
            RunnerStatus::Busy => "busy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(RunnerStatus::Online),
            "offline" => Some(RunnerStatus::Offline),
            "busy" => Some(RunnerStatus::Busy),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_with_tags(tags: &[&str]) -> Runner {
        Runner {
            id: Uuid::new_v4(),
            name: "r1".to_string(),
            token: "tok".to_string(),
            status: RunnerStatus::Online,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            max_concurrency: 1,
            active_jobs: 0,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tag_subset_matching() {
        let r = runner_with_tags(&["linux", "perf"]);
        assert!(r.satisfies_tags(&[]));
        assert!(r.satisfies_tags(&["linux".to_string()]));
        assert!(r.satisfies_tags(&["linux".to_string(), "perf".to_string()]));
        assert!(!r.satisfies_tags(&["linux".to_string(), "gpu".to_string()]));

        let bare = runner_with_tags(&["linux"]);
        assert!(!bare.satisfies_tags(&["linux".to_string(), "perf".to_string()]));
    }

    #[test]
    fn test_token_not_serialized() {
        let r = runner_with_tags(&["linux"]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("tok"));
    }
}
