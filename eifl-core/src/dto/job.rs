//! Runner protocol DTOs
//!
//! Everything exchanged on the `/runner/*` endpoints: the job payload
//! handed out at dispatch and the callback bodies flowing back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::run::{Run, RunStatus};
use crate::domain::step::{Step, StepStatus};
use crate::manifest::Manifest;

/// Response body of `GET /runner/poll`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub job: Option<JobPayload>,
}

/// Everything a runner needs to execute one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub run: Run,
    /// Steps in declared order
    pub steps: Vec<JobStep>,
    /// Absolute clone URL, or a server-relative `/git/<path>` for hosted repos
    pub repo_url: String,
    pub commit_sha: Option<String>,
    pub branch: Option<String>,
    pub pipeline_config: Manifest,
    /// Decrypted secrets, repo scope overriding project scope by name
    pub secrets: std::collections::HashMap<String, String>,
}

/// Step as carried in the job payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStep {
    pub id: Uuid,
    pub name: String,
    pub command: String,
    pub status: StepStatus,
}

impl From<Step> for JobStep {
    fn from(step: Step) -> Self {
        Self {
            id: step.id,
            name: step.name,
            command: step.command,
            status: step.status,
        }
    }
}

/// Body of `POST /runner/step`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdateRequest {
    pub step_id: Uuid,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Body of `POST /runner/output`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAppendRequest {
    pub step_id: Uuid,
    pub output: String,
}

/// One metric reported with a run completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub key: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Body of `POST /runner/complete`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRunRequest {
    pub run_id: Uuid,
    /// Must be `success` or `failed`
    pub status: RunStatus,
    #[serde(default)]
    pub metrics: Vec<MetricReport>,
}

/// Baseline comparison summary returned to the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineCheck {
    pub checked: usize,
    pub regressions: usize,
    pub has_regressions: bool,
}

/// Response body of `POST /runner/complete`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRunResponse {
    pub baseline_check: BaselineCheck,
}
