//! Pipeline Repository
//!
//! Handles all database operations related to pipelines.

use chrono::{DateTime, Utc};
use eifl_core::domain::pipeline::Pipeline;
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create a new pipeline
pub async fn create(
    pool: &SqlitePool,
    repo_id: Uuid,
    name: &str,
    config: &str,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<Pipeline, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO pipelines (id, repo_id, name, config, next_run_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(repo_id.to_string())
    .bind(name)
    .bind(config)
    .bind(next_run_at.map(time::format_ts))
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    Ok(Pipeline {
        id,
        repo_id,
        name: name.to_string(),
        config: config.to_string(),
        next_run_at,
        created_at: now,
    })
}

/// Update an existing pipeline's manifest and schedule
pub async fn update_config(
    pool: &SqlitePool,
    id: Uuid,
    config: &str,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipelines
        SET config = ?, next_run_at = ?
        WHERE id = ?
        "#,
    )
    .bind(config)
    .bind(next_run_at.map(time::format_ts))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a pipeline by ID
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, repo_id, name, config, next_run_at, created_at
        FROM pipelines
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find a pipeline by its repo and name
pub async fn find_by_repo_and_name(
    pool: &SqlitePool,
    repo_id: Uuid,
    name: &str,
) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, repo_id, name, config, next_run_at, created_at
        FROM pipelines
        WHERE repo_id = ? AND name = ?
        "#,
    )
    .bind(repo_id.to_string())
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List pipelines in a repo
pub async fn list_by_repo(pool: &SqlitePool, repo_id: Uuid) -> Result<Vec<Pipeline>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, repo_id, name, config, next_run_at, created_at
        FROM pipelines
        WHERE repo_id = ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(repo_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Pipelines whose next cron firing is due
pub async fn find_due(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<Vec<Pipeline>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, repo_id, name, config, next_run_at, created_at
        FROM pipelines
        WHERE next_run_at IS NOT NULL AND next_run_at <= ?
        ORDER BY next_run_at ASC
        "#,
    )
    .bind(time::format_ts(now))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Advance (or clear) a pipeline's next scheduled firing
pub async fn set_next_run_at(
    pool: &SqlitePool,
    id: Uuid,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pipelines SET next_run_at = ? WHERE id = ?")
        .bind(next_run_at.map(time::format_ts))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a pipeline by ID
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pipelines WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: String,
    repo_id: String,
    name: String,
    config: String,
    next_run_at: Option<String>,
    created_at: String,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            repo_id: Uuid::parse_str(&row.repo_id).unwrap_or_default(),
            name: row.name,
            config: row.config,
            next_run_at: time::parse_ts_opt(row.next_run_at.as_deref()),
            created_at: time::parse_ts_lossy(&row.created_at),
        }
    }
}
