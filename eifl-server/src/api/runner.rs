//! Runner API Handlers
//!
//! Runner registration/management plus the token-authenticated runner
//! protocol: poll, step update, output append, run completion, heartbeat.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use eifl_core::domain::runner::Runner;
use eifl_core::dto::job::{
    CompleteRunRequest, CompleteRunResponse, OutputAppendRequest, PollResponse, StepUpdateRequest,
};
use eifl_core::dto::runner::{RegisterRunner, RegisteredRunner};
use uuid::Uuid;

use crate::api::auth::authenticate_runner;
use crate::api::error::ApiResult;
use crate::repository::runner_repository;
use crate::service::{dispatch_service, lifecycle_service, runner_service};
use crate::AppState;

// =============================================================================
// Registration & Management
// =============================================================================

/// POST /api/runners
pub async fn register_runner(
    State(state): State<AppState>,
    Json(req): Json<RegisterRunner>,
) -> ApiResult<Json<RegisteredRunner>> {
    let registered = runner_service::register_runner(&state.pool, &req).await?;
    Ok(Json(registered))
}

/// GET /api/runners
pub async fn list_runners(State(state): State<AppState>) -> ApiResult<Json<Vec<Runner>>> {
    let runners = runner_service::list_runners(&state.pool).await?;
    Ok(Json(runners))
}

/// GET /api/runners/{id}
pub async fn get_runner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Runner>> {
    let runner = runner_service::get_runner(&state.pool, id).await?;
    Ok(Json(runner))
}

/// DELETE /api/runners/{id}
pub async fn delete_runner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    runner_service::delete_runner(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Runner Protocol
// =============================================================================

/// GET /runner/poll
///
/// Hand out at most one pending run matching the caller's tags and spare
/// capacity.
pub async fn poll(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<PollResponse>> {
    let runner = authenticate_runner(&state.pool, &headers).await?;

    let job = dispatch_service::poll_for_job(&state, &runner).await?;

    Ok(Json(PollResponse { job }))
}

/// POST /runner/step
pub async fn step_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StepUpdateRequest>,
) -> ApiResult<StatusCode> {
    let runner = authenticate_runner(&state.pool, &headers).await?;

    lifecycle_service::update_step(&state.pool, &req).await?;
    runner_repository::touch(&state.pool, runner.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /runner/output
pub async fn step_output(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<OutputAppendRequest>,
) -> ApiResult<StatusCode> {
    let runner = authenticate_runner(&state.pool, &headers).await?;

    lifecycle_service::append_step_output(&state.pool, req.step_id, &req.output).await?;
    runner_repository::touch(&state.pool, runner.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /runner/complete
pub async fn run_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CompleteRunRequest>,
) -> ApiResult<Json<CompleteRunResponse>> {
    let runner = authenticate_runner(&state.pool, &headers).await?;

    let baseline_check = lifecycle_service::complete_run(&state.pool, runner.id, &req).await?;

    Ok(Json(CompleteRunResponse { baseline_check }))
}

/// POST /runner/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let runner = authenticate_runner(&state.pool, &headers).await?;

    runner_repository::heartbeat(&state.pool, runner.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
