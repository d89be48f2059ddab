//! Step Repository
//!
//! Handles all database operations related to steps. Step output grows by
//! transactional append so concurrent readers only ever see prefixes.

use eifl_core::domain::step::{Step, StepStatus};
use eifl_core::manifest::StepSpec;
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Insert the steps of a run in declared order
pub async fn create_for_run(
    pool: &SqlitePool,
    run_id: Uuid,
    specs: &[StepSpec],
) -> Result<Vec<Step>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut steps = Vec::with_capacity(specs.len());

    for (seq, spec) in specs.iter().enumerate() {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO steps (id, run_id, seq, name, command, status, output)
            VALUES (?, ?, ?, ?, ?, ?, '')
            "#,
        )
        .bind(id.to_string())
        .bind(run_id.to_string())
        .bind(seq as i64)
        .bind(&spec.name)
        .bind(&spec.run)
        .bind(StepStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;

        steps.push(Step {
            id,
            run_id,
            seq: seq as i64,
            name: spec.name.clone(),
            command: spec.run.clone(),
            status: StepStatus::Pending,
            exit_code: None,
            output: String::new(),
            started_at: None,
            finished_at: None,
        });
    }

    tx.commit().await?;
    Ok(steps)
}

/// Find a step by ID
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Step>, sqlx::Error> {
    let row = sqlx::query_as::<_, StepRow>(
        r#"
        SELECT id, run_id, seq, name, command, status, exit_code, output,
               started_at, finished_at
        FROM steps
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Steps of a run in declared order
pub async fn list_by_run(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<Step>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StepRow>(
        r#"
        SELECT id, run_id, seq, name, command, status, exit_code, output,
               started_at, finished_at
        FROM steps
        WHERE run_id = ?
        ORDER BY seq ASC
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Update a step's status, stamping timestamps as it moves
///
/// `running` stamps `started_at` once; terminal statuses stamp
/// `finished_at` and record the exit code if given.
pub async fn update_status(
    pool: &SqlitePool,
    step_id: Uuid,
    status: StepStatus,
    exit_code: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let now = time::now_ts();

    let result = if status == StepStatus::Running {
        sqlx::query(
            r#"
            UPDATE steps
            SET status = ?, started_at = COALESCE(started_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(step_id.to_string())
        .execute(pool)
        .await?
    } else if status.is_terminal() {
        sqlx::query(
            r#"
            UPDATE steps
            SET status = ?, exit_code = ?, finished_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(exit_code)
        .bind(&now)
        .bind(step_id.to_string())
        .execute(pool)
        .await?
    } else {
        sqlx::query("UPDATE steps SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(step_id.to_string())
            .execute(pool)
            .await?
    };

    Ok(result.rows_affected() > 0)
}

/// Append a chunk to a step's output
pub async fn append_output(
    pool: &SqlitePool,
    step_id: Uuid,
    chunk: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE steps SET output = output || ? WHERE id = ?")
        .bind(chunk)
        .bind(step_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct StepRow {
    id: String,
    run_id: String,
    seq: i64,
    name: String,
    command: String,
    status: String,
    exit_code: Option<i64>,
    output: String,
    started_at: Option<String>,
    finished_at: Option<String>,
}

impl From<StepRow> for Step {
    fn from(row: StepRow) -> Self {
        Step {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            run_id: Uuid::parse_str(&row.run_id).unwrap_or_default(),
            seq: row.seq,
            name: row.name,
            command: row.command,
            status: StepStatus::parse(&row.status).unwrap_or(StepStatus::Pending),
            exit_code: row.exit_code,
            output: row.output,
            started_at: time::parse_ts_opt(row.started_at.as_deref()),
            finished_at: time::parse_ts_opt(row.finished_at.as_deref()),
        }
    }
}
