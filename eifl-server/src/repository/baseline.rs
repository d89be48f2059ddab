//! Baseline Repository
//!
//! Handles all database operations related to pipeline baselines.

use eifl_core::domain::baseline::Baseline;
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Insert or replace a baseline for `(pipeline_id, key)`
pub async fn upsert(
    pool: &SqlitePool,
    pipeline_id: Uuid,
    key: &str,
    baseline_value: f64,
    tolerance_pct: f64,
) -> Result<Baseline, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO baselines (id, pipeline_id, key, baseline_value, tolerance_pct, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (pipeline_id, key) DO UPDATE SET
            baseline_value = excluded.baseline_value,
            tolerance_pct = excluded.tolerance_pct,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(id.to_string())
    .bind(pipeline_id.to_string())
    .bind(key)
    .bind(baseline_value)
    .bind(tolerance_pct)
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    // The conflict path keeps the original row id; read it back.
    let row = sqlx::query_as::<_, BaselineRow>(
        r#"
        SELECT id, pipeline_id, key, baseline_value, tolerance_pct, updated_at
        FROM baselines
        WHERE pipeline_id = ? AND key = ?
        "#,
    )
    .bind(pipeline_id.to_string())
    .bind(key)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Baselines of a pipeline
pub async fn list_by_pipeline(
    pool: &SqlitePool,
    pipeline_id: Uuid,
) -> Result<Vec<Baseline>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BaselineRow>(
        r#"
        SELECT id, pipeline_id, key, baseline_value, tolerance_pct, updated_at
        FROM baselines
        WHERE pipeline_id = ?
        ORDER BY key ASC
        "#,
    )
    .bind(pipeline_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct BaselineRow {
    id: String,
    pipeline_id: String,
    key: String,
    baseline_value: f64,
    tolerance_pct: f64,
    updated_at: String,
}

impl From<BaselineRow> for Baseline {
    fn from(row: BaselineRow) -> Self {
        Baseline {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            pipeline_id: Uuid::parse_str(&row.pipeline_id).unwrap_or_default(),
            key: row.key,
            baseline_value: row.baseline_value,
            tolerance_pct: row.tolerance_pct,
            updated_at: time::parse_ts_lossy(&row.updated_at),
        }
    }
}
