//! Lifecycle Service
//!
//! Owns all run and step state transitions. Runs are created here by the
//! trigger sources (push, scheduler, manual API); every later transition
//! arrives through a runner callback or a cancel request.

use eifl_core::domain::run::{Run, RunStatus, TriggerKind};
use eifl_core::dto::job::{BaselineCheck, CompleteRunRequest, StepUpdateRequest};
use eifl_core::domain::step::StepStatus;
use eifl_core::manifest::Manifest;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::{metric_repository, run_repository, runner_repository, step_repository};
use crate::service::baseline_service;

/// Service error type
#[derive(Debug)]
pub enum LifecycleError {
    RunNotFound(Uuid),
    StepNotFound(Uuid),
    ValidationError(String),
    PreconditionFailed(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for LifecycleError {
    fn from(err: sqlx::Error) -> Self {
        LifecycleError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Create a pending run with one step row per manifest step, in order
pub async fn create_run(
    pool: &SqlitePool,
    pipeline_id: Uuid,
    manifest: &Manifest,
    triggered_by: TriggerKind,
    commit_sha: Option<&str>,
    branch: Option<&str>,
) -> Result<Run> {
    let run =
        run_repository::create(pool, pipeline_id, triggered_by, commit_sha, branch).await?;
    step_repository::create_for_run(pool, run.id, &manifest.steps).await?;

    tracing::info!(
        "Run {} created for pipeline {} ({})",
        run.id,
        pipeline_id,
        triggered_by
    );

    Ok(run)
}

/// Apply a step status update from a runner
pub async fn update_step(pool: &SqlitePool, req: &StepUpdateRequest) -> Result<()> {
    if req.status == StepStatus::Pending {
        return Err(LifecycleError::ValidationError(
            "a step cannot transition back to pending".to_string(),
        ));
    }

    let updated =
        step_repository::update_status(pool, req.step_id, req.status, req.exit_code).await?;
    if !updated {
        return Err(LifecycleError::StepNotFound(req.step_id));
    }

    if let Some(output) = req.output.as_deref() {
        if !output.is_empty() {
            step_repository::append_output(pool, req.step_id, output).await?;
        }
    }

    tracing::debug!("Step {} -> {}", req.step_id, req.status.as_str());

    Ok(())
}

/// Append a chunk of streamed output to a step
pub async fn append_step_output(pool: &SqlitePool, step_id: Uuid, output: &str) -> Result<()> {
    let appended = step_repository::append_output(pool, step_id, output).await?;
    if !appended {
        return Err(LifecycleError::StepNotFound(step_id));
    }

    Ok(())
}

/// Finish a run from a runner's completion callback
///
/// Records the reported metrics, runs the baseline comparison, and
/// releases the runner's job slot. A run that was cancelled while the
/// runner worked keeps its `cancelled` status; the rest of the bookkeeping
/// still happens so the runner's capacity is not leaked.
pub async fn complete_run(
    pool: &SqlitePool,
    runner_id: Uuid,
    req: &CompleteRunRequest,
) -> Result<BaselineCheck> {
    if !matches!(req.status, RunStatus::Success | RunStatus::Failed) {
        return Err(LifecycleError::ValidationError(format!(
            "completion status must be success or failed, got {}",
            req.status.as_str()
        )));
    }

    let run = run_repository::find_by_id(pool, req.run_id)
        .await?
        .ok_or(LifecycleError::RunNotFound(req.run_id))?;

    let finished = run_repository::finish(pool, req.run_id, req.status).await?;
    if !finished {
        tracing::warn!(
            "Completion for run {} arrived in terminal state {}; not reviving",
            req.run_id,
            run.status.as_str()
        );
    }

    for metric in &req.metrics {
        metric_repository::create(
            pool,
            req.run_id,
            &metric.key,
            metric.value,
            metric.unit.as_deref(),
        )
        .await?;
    }

    let check = baseline_service::compare(pool, run.pipeline_id, &req.metrics).await?;

    runner_repository::release_job(pool, runner_id).await?;

    tracing::info!(
        "Run {} completed: {} ({} metric(s), {} regression(s))",
        req.run_id,
        req.status.as_str(),
        req.metrics.len(),
        check.regressions
    );

    Ok(check)
}

/// Cancel a pending or running run
pub async fn cancel_run(pool: &SqlitePool, run_id: Uuid) -> Result<Run> {
    let run = run_repository::find_by_id(pool, run_id)
        .await?
        .ok_or(LifecycleError::RunNotFound(run_id))?;

    if run.status.is_terminal() {
        return Err(LifecycleError::PreconditionFailed(format!(
            "run {} is already {}",
            run_id,
            run.status.as_str()
        )));
    }

    let cancelled = run_repository::finish(pool, run_id, RunStatus::Cancelled).await?;
    if !cancelled {
        return Err(LifecycleError::PreconditionFailed(format!(
            "run {} reached a terminal state concurrently",
            run_id
        )));
    }

    tracing::info!("Run {} cancelled", run_id);

    run_repository::find_by_id(pool, run_id)
        .await?
        .ok_or(LifecycleError::RunNotFound(run_id))
}
