//! Baseline domain type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-pipeline, per-metric reference value used to flag regressions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub key: String,
    pub baseline_value: f64,
    pub tolerance_pct: f64,
    pub updated_at: DateTime<Utc>,
}

impl Baseline {
    /// Deviation of `current` from this baseline, in percent
    ///
    /// A zero baseline with a zero current value deviates 0%; a zero
    /// baseline with any other current value deviates 100%.
    pub fn deviation_pct(&self, current: f64) -> f64 {
        if self.baseline_value == 0.0 {
            if current == 0.0 {
                0.0
            } else {
                100.0
            }
        } else {
            (current - self.baseline_value).abs() / self.baseline_value.abs() * 100.0
        }
    }

    pub fn within_tolerance(&self, current: f64) -> bool {
        self.deviation_pct(current) <= self.tolerance_pct
    }
}
