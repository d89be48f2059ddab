//! Pipeline API Handlers
//!
//! Pipeline queries, the manual trigger, and baseline management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use eifl_core::domain::baseline::Baseline;
use eifl_core::domain::pipeline::Pipeline;
use eifl_core::domain::run::{Run, TriggerKind};
use eifl_core::dto::pipeline::UpsertBaseline;
use eifl_core::manifest;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::repository::{pipeline_repository, repo_repository};
use crate::service::{baseline_service, lifecycle_service};
use crate::AppState;

/// GET /api/repos/{id}/pipelines
pub async fn list_pipelines(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Pipeline>>> {
    repo_repository::find_by_id(&state.pool, repo_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Repo {} not found", repo_id)))?;

    let pipelines = pipeline_repository::list_by_repo(&state.pool, repo_id).await?;
    Ok(Json(pipelines))
}

/// GET /api/pipelines/{id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Pipeline>> {
    let pipeline = pipeline_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} not found", id)))?;

    Ok(Json(pipeline))
}

/// DELETE /api/pipelines/{id}
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = pipeline_repository::delete(&state.pool, id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Pipeline {} not found", id)));
    }

    tracing::info!("Pipeline deleted: {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/pipelines/{id}/trigger
///
/// Enqueue a manual run against the repo's default branch HEAD.
pub async fn trigger_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Run>> {
    let pipeline = pipeline_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} not found", id)))?;

    let config = manifest::parse_manifest(&pipeline.config)
        .map_err(|e| ApiError::BadRequest(format!("pipeline manifest is invalid: {}", e)))?;

    // Manual runs are allowed unless the manifest opts out explicitly.
    if let Some(triggers) = &config.triggers {
        if triggers.manual == Some(false) {
            return Err(ApiError::BadRequest(
                "manual triggering is disabled for this pipeline".to_string(),
            ));
        }
    }

    let repo = repo_repository::find_by_id(&state.pool, pipeline.repo_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Repo {} not found", pipeline.repo_id)))?;

    let head = state
        .git
        .resolve_head(&repo.path, &repo.default_branch)
        .await
        .map_err(|e| ApiError::BadRequest(format!("resolving HEAD failed: {}", e)))?
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "repo '{}' has no commit on branch '{}'",
                repo.name, repo.default_branch
            ))
        })?;

    let run = lifecycle_service::create_run(
        &state.pool,
        pipeline.id,
        &config,
        TriggerKind::Manual,
        Some(&head),
        Some(&repo.default_branch),
    )
    .await?;

    Ok(Json(run))
}

/// GET /api/pipelines/{id}/baselines
pub async fn list_baselines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Baseline>>> {
    pipeline_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} not found", id)))?;

    let baselines = crate::repository::baseline_repository::list_by_pipeline(&state.pool, id).await?;
    Ok(Json(baselines))
}

/// POST /api/pipelines/{id}/baselines
pub async fn upsert_baseline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpsertBaseline>,
) -> ApiResult<Json<Baseline>> {
    if req.key.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "baseline key cannot be empty".to_string(),
        ));
    }
    if let Some(tolerance) = req.tolerance_pct {
        if !(0.0..=100.0).contains(&tolerance) {
            return Err(ApiError::BadRequest(
                "tolerance_pct must be between 0 and 100".to_string(),
            ));
        }
    }

    pipeline_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} not found", id)))?;

    let baseline = baseline_service::upsert(
        &state.pool,
        id,
        &req.key,
        req.baseline_value,
        req.tolerance_pct,
    )
    .await?;

    Ok(Json(baseline))
}

/// POST /api/pipelines/{id}/baselines/from-run/{run_id}
///
/// Adopt a prior run's metrics as this pipeline's baselines.
pub async fn adopt_baselines(
    State(state): State<AppState>,
    Path((id, run_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Baseline>>> {
    pipeline_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} not found", id)))?;

    let adopted = baseline_service::adopt_from_run(&state.pool, id, run_id).await?;
    Ok(Json(adopted))
}
