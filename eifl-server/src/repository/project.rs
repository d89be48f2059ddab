//! Project Repository
//!
//! Handles all database operations related to projects.

use eifl_core::domain::project::Project;
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create a new project
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<Project, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, description, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(description)
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    Ok(Project {
        id,
        name: name.to_string(),
        description: description.map(|s| s.to_string()),
        created_at: now,
    })
}

/// Find a project by ID
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, description, created_at
        FROM projects
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find a project by its unique name
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, description, created_at
        FROM projects
        WHERE name = ?
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all projects
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Project>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, description, created_at
        FROM projects
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Delete a project by ID, cascading to its repos and pipelines
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    description: Option<String>,
    created_at: String,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            name: row.name,
            description: row.description,
            created_at: time::parse_ts_lossy(&row.created_at),
        }
    }
}
