//! Hook Ingress Handlers
//!
//! The Git smart-HTTP transport reports each successful receive-pack here.

use axum::{extract::State, Json};
use eifl_core::dto::push::PushEvent;

use crate::api::error::ApiResult;
use crate::service::push_service;
use crate::AppState;

/// POST /hooks/push
pub async fn push_hook(
    State(state): State<AppState>,
    Json(event): Json<PushEvent>,
) -> ApiResult<Json<serde_json::Value>> {
    tracing::info!(
        "Push to {} ({} ref update(s))",
        event.repo_path,
        event.updates.len()
    );

    let created = push_service::handle_push(&state, &event).await?;

    Ok(Json(serde_json::json!({ "runsCreated": created })))
}
