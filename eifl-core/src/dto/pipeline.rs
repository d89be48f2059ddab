//! Pipeline, run, and baseline DTOs

use serde::{Deserialize, Serialize};

use crate::domain::run::Run;
use crate::domain::step::Step;

/// A run together with its ordered steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDetails {
    pub run: Run,
    pub steps: Vec<Step>,
}

/// Upsert request for a pipeline baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertBaseline {
    pub key: String,
    pub baseline_value: f64,
    #[serde(default)]
    pub tolerance_pct: Option<f64>,
}
