//! Repo Repository
//!
//! Handles all database operations related to repositories.

use eifl_core::domain::repo::Repo;
use eifl_core::dto::project::CreateRepo;
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create a new repo under a project
pub async fn create(
    pool: &SqlitePool,
    project_id: Uuid,
    req: &CreateRepo,
) -> Result<Repo, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO repos (id, project_id, name, path, remote_url, default_branch, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(project_id.to_string())
    .bind(&req.name)
    .bind(&req.path)
    .bind(&req.remote_url)
    .bind(&req.default_branch)
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    Ok(Repo {
        id,
        project_id,
        name: req.name.clone(),
        path: req.path.clone(),
        remote_url: req.remote_url.clone(),
        default_branch: req.default_branch.clone(),
        created_at: now,
    })
}

/// Find a repo by ID
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Repo>, sqlx::Error> {
    let row = sqlx::query_as::<_, RepoRow>(
        r#"
        SELECT id, project_id, name, path, remote_url, default_branch, created_at
        FROM repos
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find a repo by its unique storage path
pub async fn find_by_path(pool: &SqlitePool, path: &str) -> Result<Option<Repo>, sqlx::Error> {
    let row = sqlx::query_as::<_, RepoRow>(
        r#"
        SELECT id, project_id, name, path, remote_url, default_branch, created_at
        FROM repos
        WHERE path = ?
        "#,
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List repos in a project
pub async fn list_by_project(
    pool: &SqlitePool,
    project_id: Uuid,
) -> Result<Vec<Repo>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RepoRow>(
        r#"
        SELECT id, project_id, name, path, remote_url, default_branch, created_at
        FROM repos
        WHERE project_id = ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Delete a repo by ID
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM repos WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RepoRow {
    id: String,
    project_id: String,
    name: String,
    path: String,
    remote_url: Option<String>,
    default_branch: String,
    created_at: String,
}

impl From<RepoRow> for Repo {
    fn from(row: RepoRow) -> Self {
        Repo {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            project_id: Uuid::parse_str(&row.project_id).unwrap_or_default(),
            name: row.name,
            path: row.path,
            remote_url: row.remote_url,
            default_branch: row.default_branch,
            created_at: time::parse_ts_lossy(&row.created_at),
        }
    }
}
