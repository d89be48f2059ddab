//! Project API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use eifl_core::domain::project::Project;
use eifl_core::dto::project::CreateProject;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::repository::project_repository;
use crate::AppState;

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProject>,
) -> ApiResult<Json<Project>> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "project name cannot be empty".to_string(),
        ));
    }

    if project_repository::find_by_name(&state.pool, &req.name)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "project '{}' already exists",
            req.name
        )));
    }

    let project =
        project_repository::create(&state.pool, &req.name, req.description.as_deref()).await?;

    tracing::info!("Project created: {} ({})", project.name, project.id);

    Ok(Json(project))
}

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    let projects = project_repository::list_all(&state.pool).await?;
    Ok(Json(projects))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = project_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;

    Ok(Json(project))
}

/// DELETE /api/projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = project_repository::delete(&state.pool, id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Project {} not found", id)));
    }

    tracing::info!("Project deleted: {}", id);

    Ok(StatusCode::NO_CONTENT)
}
