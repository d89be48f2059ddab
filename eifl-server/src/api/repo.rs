//! Repo API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use eifl_core::domain::repo::Repo;
use eifl_core::dto::project::CreateRepo;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::repository::{project_repository, repo_repository};
use crate::AppState;

/// POST /api/projects/{id}/repos
pub async fn create_repo(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateRepo>,
) -> ApiResult<Json<Repo>> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("repo name cannot be empty".to_string()));
    }
    if req.path.trim().is_empty() {
        return Err(ApiError::BadRequest("repo path cannot be empty".to_string()));
    }

    project_repository::find_by_id(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", project_id)))?;

    let repo = repo_repository::create(&state.pool, project_id, &req)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                ApiError::Conflict(format!(
                    "a repo named '{}' or at path '{}' already exists",
                    req.name, req.path
                ))
            }
            _ => ApiError::DatabaseError(e),
        })?;

    tracing::info!("Repo created: {} at {}", repo.name, repo.path);

    Ok(Json(repo))
}

/// GET /api/projects/{id}/repos
pub async fn list_repos(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Repo>>> {
    project_repository::find_by_id(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", project_id)))?;

    let repos = repo_repository::list_by_project(&state.pool, project_id).await?;
    Ok(Json(repos))
}

/// GET /api/repos/{id}
pub async fn get_repo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Repo>> {
    let repo = repo_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Repo {} not found", id)))?;

    Ok(Json(repo))
}

/// DELETE /api/repos/{id}
pub async fn delete_repo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = repo_repository::delete(&state.pool, id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Repo {} not found", id)));
    }

    tracing::info!("Repo deleted: {}", id);

    Ok(StatusCode::NO_CONTENT)
}
