//! Metric domain type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A numeric measurement captured from a run
///
/// `(run_id, key)` is deliberately not unique: the per-key history over all
/// successful runs is what baseline tooling consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: Uuid,
    pub run_id: Uuid,
    pub key: String,
    pub value: f64,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}
