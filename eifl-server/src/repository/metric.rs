//! Metric Repository
//!
//! Handles all database operations related to run metrics.

use eifl_core::domain::metric::Metric;
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Record a metric for a run
///
/// Appends unconditionally; `(run_id, key)` is not unique.
pub async fn create(
    pool: &SqlitePool,
    run_id: Uuid,
    key: &str,
    value: f64,
    unit: Option<&str>,
) -> Result<Metric, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO metrics (id, run_id, key, value, unit, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(run_id.to_string())
    .bind(key)
    .bind(value)
    .bind(unit)
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    Ok(Metric {
        id,
        run_id,
        key: key.to_string(),
        value,
        unit: unit.map(|s| s.to_string()),
        created_at: now,
    })
}

/// Metrics recorded for a run
pub async fn list_by_run(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<Metric>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MetricRow>(
        r#"
        SELECT id, run_id, key, value, unit, created_at
        FROM metrics
        WHERE run_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct MetricRow {
    id: String,
    run_id: String,
    key: String,
    value: f64,
    unit: Option<String>,
    created_at: String,
}

impl From<MetricRow> for Metric {
    fn from(row: MetricRow) -> Self {
        Metric {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            run_id: Uuid::parse_str(&row.run_id).unwrap_or_default(),
            key: row.key,
            value: row.value,
            unit: row.unit,
            created_at: time::parse_ts_lossy(&row.created_at),
        }
    }
}
