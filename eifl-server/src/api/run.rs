//! Run API Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use eifl_core::domain::metric::Metric;
use eifl_core::domain::run::Run;
use eifl_core::dto::pipeline::RunDetails;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::repository::{metric_repository, pipeline_repository, run_repository, step_repository};
use crate::service::lifecycle_service;
use crate::AppState;

/// GET /api/pipelines/{id}/runs
pub async fn list_runs(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Run>>> {
    pipeline_repository::find_by_id(&state.pool, pipeline_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} not found", pipeline_id)))?;

    let runs = run_repository::list_by_pipeline(&state.pool, pipeline_id).await?;
    Ok(Json(runs))
}

/// GET /api/runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RunDetails>> {
    let run = run_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Run {} not found", id)))?;

    let steps = step_repository::list_by_run(&state.pool, id).await?;

    Ok(Json(RunDetails { run, steps }))
}

/// POST /api/runs/{id}/cancel
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Run>> {
    let run = lifecycle_service::cancel_run(&state.pool, id).await?;
    Ok(Json(run))
}

/// GET /api/runs/{id}/metrics
pub async fn list_metrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Metric>>> {
    run_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Run {} not found", id)))?;

    let metrics = metric_repository::list_by_run(&state.pool, id).await?;
    Ok(Json(metrics))
}
