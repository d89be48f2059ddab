//! Scheduler Service
//!
//! The cooperative tick: find pipelines whose `next_run_at` is due, advance
//! the schedule, and enqueue one run each. The tick runs once at startup
//! and then on an interval (default 60 s).
//!
//! Double-fire defenses, both required: `next_run_at` is advanced before
//! the run is inserted (a slow tick cannot re-pick the pipeline), and no
//! scheduled run is created while any run of the pipeline is still pending
//! or running (a long run can span many cron periods).

use chrono::{DateTime, Utc};
use eifl_core::cron;
use eifl_core::domain::pipeline::Pipeline;
use eifl_core::domain::run::TriggerKind;
use eifl_core::manifest::{self, Manifest};

use crate::repository::{pipeline_repository, repo_repository, run_repository, runner_repository};
use crate::service::lifecycle_service;
use crate::AppState;

/// What one tick did, for logging and tests
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub due: usize,
    pub created: usize,
}

/// Spawn the scheduler loop as a background task
pub fn spawn(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.scheduler_interval);

        loop {
            // First tick fires immediately, covering the startup run.
            interval.tick().await;

            match run_tick(&state).await {
                Ok(outcome) if outcome.due > 0 => {
                    tracing::info!(
                        "Scheduler tick: {} due pipeline(s), {} run(s) created",
                        outcome.due,
                        outcome.created
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Scheduler tick failed: {:?}", e);
                }
            }
        }
    })
}

/// Execute one scheduler tick
///
/// A failure on one pipeline never aborts the tick; it is logged and the
/// loop continues with the next due pipeline.
pub async fn run_tick(state: &AppState) -> Result<TickOutcome, sqlx::Error> {
    let now = Utc::now();
    let due = pipeline_repository::find_due(&state.pool, now).await?;

    let mut outcome = TickOutcome {
        due: due.len(),
        ..TickOutcome::default()
    };

    for pipeline in due {
        match fire_pipeline(state, &pipeline, now).await {
            Ok(true) => outcome.created += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Scheduling pipeline {} failed: {:?}", pipeline.id, e);
            }
        }
    }

    let stale = runner_repository::mark_stale_offline(
        &state.pool,
        state.config.runner_stale_after.as_secs() as i64,
    )
    .await?;
    if stale > 0 {
        tracing::info!("Marked {} runner(s) offline for missing heartbeats", stale);
    }

    Ok(outcome)
}

async fn fire_pipeline(
    state: &AppState,
    pipeline: &Pipeline,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let config = match manifest::parse_manifest(&pipeline.config) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(
                "Pipeline {} has an unparseable manifest, clearing its schedule: {}",
                pipeline.id,
                e
            );
            pipeline_repository::set_next_run_at(&state.pool, pipeline.id, None).await?;
            return Ok(false);
        }
    };

    // Advance the schedule before anything else; only then is it safe to
    // think about creating a run.
    let next = next_schedule_after(&config, now);
    pipeline_repository::set_next_run_at(&state.pool, pipeline.id, next).await?;

    let repo = match repo_repository::find_by_id(&state.pool, pipeline.repo_id).await? {
        Some(r) => r,
        None => {
            tracing::warn!("Pipeline {} has no repo; skipping", pipeline.id);
            return Ok(false);
        }
    };

    let head = match state.git.resolve_head(&repo.path, &repo.default_branch).await {
        Ok(Some(sha)) => sha,
        Ok(None) => {
            tracing::warn!(
                "Repo {} has no commit on branch '{}'; skipping pipeline {}",
                repo.path,
                repo.default_branch,
                pipeline.id
            );
            return Ok(false);
        }
        Err(e) => {
            tracing::warn!("Resolving HEAD of {} failed: {}", repo.path, e);
            return Ok(false);
        }
    };

    if run_repository::has_pending_or_running(&state.pool, pipeline.id).await? {
        tracing::debug!(
            "Pipeline {} already has a pending or running run; skipping",
            pipeline.id
        );
        return Ok(false);
    }

    match lifecycle_service::create_run(
        &state.pool,
        pipeline.id,
        &config,
        TriggerKind::Schedule,
        Some(&head),
        Some(&repo.default_branch),
    )
    .await
    {
        Ok(_) => Ok(true),
        Err(lifecycle_service::LifecycleError::DatabaseError(err)) => Err(err),
        Err(other) => {
            tracing::error!("Creating scheduled run failed: {:?}", other);
            Ok(false)
        }
    }
}

/// Earliest next firing across a manifest's schedule entries
///
/// Invalid cron expressions are logged and skipped rather than failing the
/// pipeline; a manifest with only invalid entries simply loses its
/// schedule.
pub fn next_schedule_after(config: &Manifest, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let entries = config.triggers.as_ref()?.schedule.as_ref()?;

    entries
        .iter()
        .filter_map(|entry| match cron::next_after(&entry.cron, after) {
            Ok(next) => Some(next),
            Err(e) => {
                tracing::warn!("Skipping schedule entry: {}", e);
                None
            }
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use eifl_core::manifest::parse_manifest;

    #[test]
    fn test_next_schedule_picks_earliest_entry() {
        let config = parse_manifest(
            r#"{
                "name": "x",
                "triggers": { "schedule": [
                    { "cron": "0 12 * * *" },
                    { "cron": "30 9 * * *" }
                ]},
                "steps": [{ "name": "a", "run": "true" }]
            }"#,
        )
        .unwrap();

        let after = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_schedule_after(&config, after),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let config = parse_manifest(
            r#"{
                "name": "x",
                "triggers": { "schedule": [
                    { "cron": "not cron" },
                    { "cron": "0 12 * * *" }
                ]},
                "steps": [{ "name": "a", "run": "true" }]
            }"#,
        )
        .unwrap();

        let after = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_schedule_after(&config, after),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_no_schedule_block() {
        let config = parse_manifest(
            r#"{ "name": "x", "steps": [{ "name": "a", "run": "true" }] }"#,
        )
        .unwrap();
        assert_eq!(next_schedule_after(&config, Utc::now()), None);
    }
}
