//! API Error Handling
//!
//! Unified error type and conversion for API responses. Service errors map
//! onto it with `From` impls so handlers stay on `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::service::{
    baseline::BaselineError, dispatch::DispatchError, lifecycle::LifecycleError, push::PushError,
    runner::RunnerError, secret::SecretError,
};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unauthorized,
    PreconditionFailed(String),
    NotConfigured(String),
    DatabaseError(sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or unknown runner token".to_string(),
            ),
            ApiError::PreconditionFailed(msg) => (StatusCode::PRECONDITION_FAILED, msg),
            ApiError::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::RunNotFound(id) => ApiError::NotFound(format!("Run {} not found", id)),
            LifecycleError::StepNotFound(id) => {
                ApiError::NotFound(format!("Step {} not found", id))
            }
            LifecycleError::ValidationError(msg) => ApiError::BadRequest(msg),
            LifecycleError::PreconditionFailed(msg) => ApiError::PreconditionFailed(msg),
            LifecycleError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<RunnerError> for ApiError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::NotFound(id) => ApiError::NotFound(format!("Runner {} not found", id)),
            RunnerError::Conflict(msg) => ApiError::Conflict(msg),
            RunnerError::ValidationError(msg) => ApiError::BadRequest(msg),
            RunnerError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<SecretError> for ApiError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::NotConfigured(msg) => ApiError::NotConfigured(msg),
            SecretError::ScopeNotFound(id) => {
                ApiError::NotFound(format!("Scope {} not found", id))
            }
            SecretError::SecretNotFound(name) => {
                ApiError::NotFound(format!("Secret '{}' not found", name))
            }
            SecretError::Conflict(msg) => ApiError::Conflict(msg),
            SecretError::ValidationError(msg) => ApiError::BadRequest(msg),
            SecretError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<PushError> for ApiError {
    fn from(err: PushError) -> Self {
        match err {
            PushError::RepoNotFound(path) => {
                ApiError::NotFound(format!("Repo at '{}' not found", path))
            }
            PushError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<BaselineError> for ApiError {
    fn from(err: BaselineError) -> Self {
        match err {
            BaselineError::RunNotFound(id) => ApiError::NotFound(format!("Run {} not found", id)),
            BaselineError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
