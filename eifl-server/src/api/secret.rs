//! Secret API Handlers
//!
//! Secret management at project or repo scope. Values never appear in
//! responses; listings carry names and timestamps only. When the
//! encryption key is missing these endpoints answer 503.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use eifl_core::domain::secret::SecretScope;
use eifl_core::dto::secret::{SecretInfo, SetSecret};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::secret_service;
use crate::AppState;

fn parse_scope(scope: &str) -> Result<SecretScope, ApiError> {
    SecretScope::parse(scope)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown secret scope '{}'", scope)))
}

/// POST /api/secrets/{scope}/{scope_id}
pub async fn set_secret(
    State(state): State<AppState>,
    Path((scope, scope_id)): Path<(String, Uuid)>,
    Json(req): Json<SetSecret>,
) -> ApiResult<Json<SecretInfo>> {
    let scope = parse_scope(&scope)?;

    let info =
        secret_service::set_secret(&state.pool, &state.secrets, scope, scope_id, &req).await?;

    Ok(Json(info))
}

/// GET /api/secrets/{scope}/{scope_id}
pub async fn list_secrets(
    State(state): State<AppState>,
    Path((scope, scope_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Vec<SecretInfo>>> {
    let scope = parse_scope(&scope)?;

    let infos = secret_service::list_secrets(&state.pool, scope, scope_id).await?;
    Ok(Json(infos))
}

/// DELETE /api/secrets/{scope}/{scope_id}/{name}
pub async fn delete_secret(
    State(state): State<AppState>,
    Path((scope, scope_id, name)): Path<(String, Uuid, String)>,
) -> ApiResult<StatusCode> {
    let scope = parse_scope(&scope)?;

    secret_service::delete_secret(&state.pool, scope, scope_id, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
