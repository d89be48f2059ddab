//! Push Service
//!
//! Runs after a successful Git receive-pack. For every updated branch head
//! the pushed commit's `.eifl.json` decides whether a pipeline is
//! (re)registered and a run enqueued. Each push is an independent event;
//! no duplicate suppression is applied here.

use chrono::Utc;
use eifl_core::domain::run::TriggerKind;
use eifl_core::dto::push::{PushEvent, RefUpdate};
use eifl_core::manifest;

use crate::repository::{pipeline_repository, repo_repository};
use crate::service::{lifecycle_service, scheduler_service};
use crate::AppState;

pub const MANIFEST_FILE: &str = ".eifl.json";

/// Service error type
#[derive(Debug)]
pub enum PushError {
    RepoNotFound(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for PushError {
    fn from(err: sqlx::Error) -> Self {
        PushError::DatabaseError(err)
    }
}

/// Handle the ref updates of one push
///
/// Returns the number of runs enqueued. A failure on one ref is logged and
/// the remaining refs are still processed.
pub async fn handle_push(state: &AppState, event: &PushEvent) -> Result<usize, PushError> {
    let repo = repo_repository::find_by_path(&state.pool, &event.repo_path)
        .await?
        .ok_or_else(|| PushError::RepoNotFound(event.repo_path.clone()))?;

    let mut created = 0;

    for update in &event.updates {
        match process_ref(state, &repo, update).await {
            Ok(true) => created += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(
                    "Push processing failed for {} {}: {:?}",
                    event.repo_path,
                    update.refname,
                    e
                );
            }
        }
    }

    Ok(created)
}

async fn process_ref(
    state: &AppState,
    repo: &eifl_core::domain::repo::Repo,
    update: &RefUpdate,
) -> Result<bool, sqlx::Error> {
    if update.is_deletion() {
        return Ok(false);
    }

    let branch = match update.branch() {
        Some(b) => b,
        None => return Ok(false),
    };

    let raw = match state
        .git
        .read_file_at_ref(&repo.path, &update.newrev, MANIFEST_FILE)
        .await
    {
        Ok(Some(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(None) => {
            tracing::debug!("No {} at {} in {}", MANIFEST_FILE, update.newrev, repo.path);
            return Ok(false);
        }
        Err(e) => {
            tracing::warn!("Reading {} from {} failed: {}", MANIFEST_FILE, repo.path, e);
            return Ok(false);
        }
    };

    let config = match manifest::parse_manifest(&raw) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("Invalid {} in {} at {}: {}", MANIFEST_FILE, repo.path, update.newrev, e);
            return Ok(false);
        }
    };

    // Register or refresh the pipeline even when this particular push does
    // not trigger it, so schedule changes land as soon as they are pushed.
    let next_run_at = scheduler_service::next_schedule_after(&config, Utc::now());

    let pipeline =
        match pipeline_repository::find_by_repo_and_name(&state.pool, repo.id, &config.name)
            .await?
        {
            Some(existing) => {
                pipeline_repository::update_config(&state.pool, existing.id, &raw, next_run_at)
                    .await?;
                existing
            }
            None => {
                pipeline_repository::create(&state.pool, repo.id, &config.name, &raw, next_run_at)
                    .await?
            }
        };

    if !manifest::should_trigger_on_push(&config, branch) {
        tracing::debug!(
            "Pipeline {} not triggered by push to '{}'",
            pipeline.id,
            branch
        );
        return Ok(false);
    }

    match lifecycle_service::create_run(
        &state.pool,
        pipeline.id,
        &config,
        TriggerKind::Push,
        Some(&update.newrev),
        Some(branch),
    )
    .await
    {
        Ok(_) => Ok(true),
        Err(lifecycle_service::LifecycleError::DatabaseError(err)) => Err(err),
        Err(other) => {
            tracing::error!("Creating push run failed: {:?}", other);
            Ok(false)
        }
    }
}
