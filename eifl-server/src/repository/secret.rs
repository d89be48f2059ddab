//! Secret Repository
//!
//! Handles all database operations related to secrets. Values arrive here
//! already encrypted; nothing in this module ever sees plaintext.

use eifl_core::domain::secret::{Secret, SecretScope};
use eifl_core::time;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Store a new secret at a scope
///
/// Fails with a unique-constraint violation when `(scope, scope_id, name)`
/// already exists; the service maps that to a conflict.
pub async fn create(
    pool: &SqlitePool,
    scope: SecretScope,
    scope_id: Uuid,
    name: &str,
    encrypted_value: &str,
    iv: &str,
) -> Result<Secret, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO secrets (id, scope, scope_id, name, encrypted_value, iv, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(scope.as_str())
    .bind(scope_id.to_string())
    .bind(name)
    .bind(encrypted_value)
    .bind(iv)
    .bind(time::format_ts(now))
    .bind(time::format_ts(now))
    .execute(pool)
    .await?;

    Ok(Secret {
        id,
        scope,
        scope_id,
        name: name.to_string(),
        encrypted_value: encrypted_value.to_string(),
        iv: iv.to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Secrets at one scope, ordered by name
pub async fn list_by_scope(
    pool: &SqlitePool,
    scope: SecretScope,
    scope_id: Uuid,
) -> Result<Vec<Secret>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SecretRow>(
        r#"
        SELECT id, scope, scope_id, name, encrypted_value, iv, created_at, updated_at
        FROM secrets
        WHERE scope = ? AND scope_id = ?
        ORDER BY name ASC
        "#,
    )
    .bind(scope.as_str())
    .bind(scope_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Delete a secret by scope and name
pub async fn delete(
    pool: &SqlitePool,
    scope: SecretScope,
    scope_id: Uuid,
    name: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM secrets WHERE scope = ? AND scope_id = ? AND name = ?")
        .bind(scope.as_str())
        .bind(scope_id.to_string())
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct SecretRow {
    id: String,
    scope: String,
    scope_id: String,
    name: String,
    encrypted_value: String,
    iv: String,
    created_at: String,
    updated_at: String,
}

impl From<SecretRow> for Secret {
    fn from(row: SecretRow) -> Self {
        Secret {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            scope: SecretScope::parse(&row.scope).unwrap_or(SecretScope::Project),
            scope_id: Uuid::parse_str(&row.scope_id).unwrap_or_default(),
            name: row.name,
            encrypted_value: row.encrypted_value,
            iv: row.iv,
            created_at: time::parse_ts_lossy(&row.created_at),
            updated_at: time::parse_ts_lossy(&row.updated_at),
        }
    }
}
