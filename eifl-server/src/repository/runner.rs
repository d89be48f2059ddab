//! Runner Repository
//!
//! Handles all database operations related to runners. Runner `tags` are
//! stored as a JSON array; `active_jobs` only moves through the atomic
//! increment/decrement operations here and in the dispatch reservation.

use chrono::Utc;
use eifl_core::domain::runner::{Runner, RunnerStatus};
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create a runner with a freshly minted token
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    token: &str,
    tags: &[String],
    max_concurrency: i64,
) -> Result<Runner, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        r#"
        INSERT INTO runners (id, name, token, status, tags, max_concurrency, active_jobs, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(token)
    .bind(RunnerStatus::Online.as_str())
    .bind(tags_json)
    .bind(max_concurrency)
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    Ok(Runner {
        id,
        name: name.to_string(),
        token: token.to_string(),
        status: RunnerStatus::Online,
        tags: tags.to_vec(),
        max_concurrency,
        active_jobs: 0,
        last_seen: None,
        created_at: now,
    })
}

/// Find a runner by ID
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Runner>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunnerRow>(
        r#"
        SELECT id, name, token, status, tags, max_concurrency, active_jobs, last_seen, created_at
        FROM runners
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find a runner by its bearer token
pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Runner>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunnerRow>(
        r#"
        SELECT id, name, token, status, tags, max_concurrency, active_jobs, last_seen, created_at
        FROM runners
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all runners
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Runner>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunnerRow>(
        r#"
        SELECT id, name, token, status, tags, max_concurrency, active_jobs, last_seen, created_at
        FROM runners
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Refresh `last_seen` without touching status
pub async fn touch(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE runners SET last_seen = ? WHERE id = ?")
        .bind(time::now_ts())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Heartbeat: refresh `last_seen` and mark the runner online
pub async fn heartbeat(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE runners SET last_seen = ?, status = 'online' WHERE id = ?")
        .bind(time::now_ts())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Release one job slot after a run completes
///
/// `active_jobs` clamps at zero and the runner goes back online even when
/// other jobs are still in flight; `busy` only ever means "was at capacity
/// at dispatch time".
pub async fn release_job(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE runners
        SET active_jobs = CASE WHEN active_jobs > 0 THEN active_jobs - 1 ELSE 0 END,
            status = 'online',
            last_seen = ?
        WHERE id = ?
        "#,
    )
    .bind(time::now_ts())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark runners without a recent heartbeat as offline
///
/// Returns the number of runners marked.
pub async fn mark_stale_offline(
    pool: &SqlitePool,
    stale_after_seconds: i64,
) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - chrono::Duration::seconds(stale_after_seconds);

    let result = sqlx::query(
        r#"
        UPDATE runners
        SET status = 'offline'
        WHERE status != 'offline'
          AND (last_seen IS NULL OR last_seen < ?)
        "#,
    )
    .bind(time::format_ts(cutoff))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a runner by ID
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM runners WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunnerRow {
    id: String,
    name: String,
    token: String,
    status: String,
    tags: String,
    max_concurrency: i64,
    active_jobs: i64,
    last_seen: Option<String>,
    created_at: String,
}

impl From<RunnerRow> for Runner {
    fn from(row: RunnerRow) -> Self {
        Runner {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            name: row.name,
            token: row.token,
            status: RunnerStatus::parse(&row.status).unwrap_or(RunnerStatus::Offline),
            tags: serde_json::from_str(&row.tags).unwrap_or_default(),
            max_concurrency: row.max_concurrency,
            active_jobs: row.active_jobs,
            last_seen: time::parse_ts_opt(row.last_seen.as_deref()),
            created_at: time::parse_ts_lossy(&row.created_at),
        }
    }
}
