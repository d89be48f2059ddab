//! Runner authentication
//!
//! Every `/runner/*` endpoint carries `Authorization: Bearer <token>`,
//! where the token was minted at registration. Runners are trusted once
//! authenticated; there is no per-endpoint authorization beyond this.

use axum::http::{header, HeaderMap};
use eifl_core::domain::runner::Runner;
use sqlx::SqlitePool;

use crate::api::error::ApiError;
use crate::repository::runner_repository;

/// Resolve the calling runner from the Authorization header
pub async fn authenticate_runner(
    pool: &SqlitePool,
    headers: &HeaderMap,
) -> Result<Runner, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = value.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

    runner_repository::find_by_token(pool, token)
        .await?
        .ok_or(ApiError::Unauthorized)
}
