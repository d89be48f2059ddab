//! Pipeline domain type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pipeline registered for a repository
///
/// `config` holds the raw manifest JSON as pushed; it is parsed on read so
/// that manifests written by newer clients keep round-tripping unchanged.
/// `next_run_at` is the earliest future cron firing, or None for pipelines
/// without schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub repo_id: Uuid,
    pub name: String,
    pub config: String,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
