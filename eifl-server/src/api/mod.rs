//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod auth;
pub mod error;
pub mod health;
pub mod hooks;
pub mod pipeline;
pub mod project;
pub mod repo;
pub mod run;
pub mod runner;
pub mod secret;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Project endpoints
        .route("/api/projects", post(project::create_project))
        .route("/api/projects", get(project::list_projects))
        .route("/api/projects/{id}", get(project::get_project))
        .route("/api/projects/{id}", delete(project::delete_project))
        // Repo endpoints
        .route("/api/projects/{id}/repos", post(repo::create_repo))
        .route("/api/projects/{id}/repos", get(repo::list_repos))
        .route("/api/repos/{id}", get(repo::get_repo))
        .route("/api/repos/{id}", delete(repo::delete_repo))
        // Pipeline endpoints
        .route("/api/repos/{id}/pipelines", get(pipeline::list_pipelines))
        .route("/api/pipelines/{id}", get(pipeline::get_pipeline))
        .route("/api/pipelines/{id}", delete(pipeline::delete_pipeline))
        .route("/api/pipelines/{id}/trigger", post(pipeline::trigger_pipeline))
        .route("/api/pipelines/{id}/baselines", get(pipeline::list_baselines))
        .route("/api/pipelines/{id}/baselines", post(pipeline::upsert_baseline))
        .route(
            "/api/pipelines/{id}/baselines/from-run/{run_id}",
            post(pipeline::adopt_baselines),
        )
        // Run endpoints
        .route("/api/pipelines/{id}/runs", get(run::list_runs))
        .route("/api/runs/{id}", get(run::get_run))
        .route("/api/runs/{id}/cancel", post(run::cancel_run))
        .route("/api/runs/{id}/metrics", get(run::list_metrics))
        // Runner management
        .route("/api/runners", post(runner::register_runner))
        .route("/api/runners", get(runner::list_runners))
        .route("/api/runners/{id}", get(runner::get_runner))
        .route("/api/runners/{id}", delete(runner::delete_runner))
        // Secret management
        .route("/api/secrets/{scope}/{scope_id}", post(secret::set_secret))
        .route("/api/secrets/{scope}/{scope_id}", get(secret::list_secrets))
        .route(
            "/api/secrets/{scope}/{scope_id}/{name}",
            delete(secret::delete_secret),
        )
        // Git transport ingress
        .route("/hooks/push", post(hooks::push_hook))
        // Runner protocol
        .route("/runner/poll", get(runner::poll))
        .route("/runner/step", post(runner::step_update))
        .route("/runner/output", post(runner::step_output))
        .route("/runner/complete", post(runner::run_complete))
        .route("/runner/heartbeat", post(runner::heartbeat))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
