//! Run Repository
//!
//! Handles all database operations related to runs, including the atomic
//! dispatch reservation.

use chrono::Utc;
use eifl_core::domain::run::{Run, RunStatus, TriggerKind};
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create a new pending run
pub async fn create(
    pool: &SqlitePool,
    pipeline_id: Uuid,
    triggered_by: TriggerKind,
    commit_sha: Option<&str>,
    branch: Option<&str>,
) -> Result<Run, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO runs (id, pipeline_id, status, commit_sha, branch, triggered_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(pipeline_id.to_string())
    .bind(RunStatus::Pending.as_str())
    .bind(commit_sha)
    .bind(branch)
    .bind(triggered_by.as_str())
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    Ok(Run {
        id,
        pipeline_id,
        status: RunStatus::Pending,
        commit_sha: commit_sha.map(|s| s.to_string()),
        branch: branch.map(|s| s.to_string()),
        triggered_by,
        started_at: None,
        finished_at: None,
        created_at: now,
    })
}

/// Find a run by ID
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Run>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, pipeline_id, status, commit_sha, branch, triggered_by,
               started_at, finished_at, created_at
        FROM runs
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List runs for a pipeline, newest first
pub async fn list_by_pipeline(
    pool: &SqlitePool,
    pipeline_id: Uuid,
) -> Result<Vec<Run>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, pipeline_id, status, commit_sha, branch, triggered_by,
               started_at, finished_at, created_at
        FROM runs
        WHERE pipeline_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(pipeline_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Pending runs in dispatch order (oldest first)
pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<Run>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, pipeline_id, status, commit_sha, branch, triggered_by,
               started_at, finished_at, created_at
        FROM runs
        WHERE status = 'pending'
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Whether the pipeline already has a pending or running run
///
/// The scheduler's idempotence check: while this holds, no new scheduled
/// run is created for the pipeline.
pub async fn has_pending_or_running(
    pool: &SqlitePool,
    pipeline_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM runs
        WHERE pipeline_id = ? AND status IN ('pending', 'running')
        "#,
    )
    .bind(pipeline_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(row.0 > 0)
}

/// Atomically reserve a pending run for a runner
///
/// In one transaction: flip the run `pending -> running` with a
/// conditional update, bump the runner's `active_jobs`, and mark the
/// runner `busy` when the bump reaches its concurrency limit. Returns
/// false when a concurrent poll won the run first; the caller moves on to
/// its next candidate.
pub async fn reserve_for_runner(
    pool: &SqlitePool,
    run_id: Uuid,
    runner_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let now = time::now_ts();
    let mut tx = pool.begin().await?;

    let reserved = sqlx::query(
        r#"
        UPDATE runs
        SET status = 'running', started_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(&now)
    .bind(run_id.to_string())
    .execute(&mut *tx)
    .await?;

    if reserved.rows_affected() != 1 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE runners
        SET active_jobs = active_jobs + 1,
            status = CASE WHEN active_jobs + 1 >= max_concurrency
                          THEN 'busy' ELSE 'online' END,
            last_seen = ?
        WHERE id = ?
        "#,
    )
    .bind(&now)
    .bind(runner_id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Set a terminal status on a run that is still pending or running
///
/// Returns false when the run was already terminal.
pub async fn finish(
    pool: &SqlitePool,
    run_id: Uuid,
    status: RunStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE runs
        SET status = ?, finished_at = ?
        WHERE id = ? AND status IN ('pending', 'running')
        "#,
    )
    .bind(status.as_str())
    .bind(time::now_ts())
    .bind(run_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: String,
    pipeline_id: String,
    status: String,
    commit_sha: Option<String>,
    branch: Option<String>,
    triggered_by: String,
    started_at: Option<String>,
    finished_at: Option<String>,
    created_at: String,
}

impl From<RunRow> for Run {
    fn from(row: RunRow) -> Self {
        Run {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            pipeline_id: Uuid::parse_str(&row.pipeline_id).unwrap_or_default(),
            status: RunStatus::parse(&row.status).unwrap_or(RunStatus::Pending),
            commit_sha: row.commit_sha,
            branch: row.branch,
            triggered_by: TriggerKind::parse(&row.triggered_by).unwrap_or(TriggerKind::Manual),
            started_at: time::parse_ts_opt(row.started_at.as_deref()),
            finished_at: time::parse_ts_opt(row.finished_at.as_deref()),
            created_at: time::parse_ts_lossy(&row.created_at),
        }
    }
}
