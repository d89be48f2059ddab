//! Runner protocol endpoints

use eifl_core::domain::run::RunStatus;
use eifl_core::domain::step::StepStatus;
use eifl_core::dto::job::{
    CompleteRunRequest, CompleteRunResponse, JobPayload, MetricReport, OutputAppendRequest,
    PollResponse, StepUpdateRequest,
};
use uuid::Uuid;

use crate::error::Result;
use crate::ServerClient;

impl ServerClient {
    /// Poll for a job
    ///
    /// Returns None when the server has nothing eligible for this runner.
    pub async fn poll_job(&self) -> Result<Option<JobPayload>> {
        let response = self.get("/runner/poll").send().await?;
        let poll: PollResponse = self.handle_response(response).await?;
        Ok(poll.job)
    }

    /// Report a step status change
    pub async fn update_step(
        &self,
        step_id: Uuid,
        status: StepStatus,
        exit_code: Option<i64>,
        output: Option<String>,
    ) -> Result<()> {
        let response = self
            .post("/runner/step")
            .json(&StepUpdateRequest {
                step_id,
                status,
                exit_code,
                output,
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Append a chunk of step output
    pub async fn append_output(&self, step_id: Uuid, output: impl Into<String>) -> Result<()> {
        let response = self
            .post("/runner/output")
            .json(&OutputAppendRequest {
                step_id,
                output: output.into(),
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Report run completion with collected metrics
    ///
    /// Returns the server's baseline regression summary.
    pub async fn complete_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        metrics: Vec<MetricReport>,
    ) -> Result<CompleteRunResponse> {
        let response = self
            .post("/runner/complete")
            .json(&CompleteRunRequest {
                run_id,
                status,
                metrics,
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Send a heartbeat
    ///
    /// Keeps the runner marked online. Should be called periodically.
    pub async fn heartbeat(&self) -> Result<()> {
        let response = self.post("/runner/heartbeat").send().await?;
        self.handle_empty_response(response).await
    }
}
