//! Runner Service
//!
//! Business logic for runner registration and management. Tokens are
//! minted here at registration and returned exactly once.

use eifl_core::domain::runner::Runner;
use eifl_core::dto::runner::{RegisterRunner, RegisteredRunner};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::runner_repository;

/// Service error type
#[derive(Debug)]
pub enum RunnerError {
    NotFound(Uuid),
    Conflict(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for RunnerError {
    fn from(err: sqlx::Error) -> Self {
        RunnerError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Register a runner and mint its bearer token
pub async fn register_runner(pool: &SqlitePool, req: &RegisterRunner) -> Result<RegisteredRunner> {
    validate_register_request(req)?;

    let token = mint_token();
    let runner = runner_repository::create(pool, &req.name, &token, &req.tags, req.max_concurrency)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RunnerError::Conflict(format!("runner '{}' already exists", req.name))
            } else {
                RunnerError::DatabaseError(e)
            }
        })?;

    tracing::info!("Runner registered: {} ({})", runner.name, runner.id);

    Ok(RegisteredRunner { runner, token })
}

/// Get a runner by ID
pub async fn get_runner(pool: &SqlitePool, id: Uuid) -> Result<Runner> {
    runner_repository::find_by_id(pool, id)
        .await?
        .ok_or(RunnerError::NotFound(id))
}

/// List all runners
pub async fn list_runners(pool: &SqlitePool) -> Result<Vec<Runner>> {
    Ok(runner_repository::list_all(pool).await?)
}

/// Delete a runner
pub async fn delete_runner(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let deleted = runner_repository::delete(pool, id).await?;
    if !deleted {
        return Err(RunnerError::NotFound(id));
    }

    tracing::info!("Runner deleted: {}", id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_register_request(req: &RegisterRunner) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(RunnerError::ValidationError(
            "runner name cannot be empty".to_string(),
        ));
    }

    if req.max_concurrency < 1 {
        return Err(RunnerError::ValidationError(
            "max_concurrency must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn mint_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        let ok = RegisterRunner {
            name: "builder-1".to_string(),
            tags: vec!["linux".to_string()],
            max_concurrency: 2,
        };
        assert!(validate_register_request(&ok).is_ok());

        let empty = RegisterRunner {
            name: "  ".to_string(),
            ..ok.clone()
        };
        assert!(validate_register_request(&empty).is_err());

        let zero = RegisterRunner {
            max_concurrency: 0,
            ..ok.clone()
        };
        assert!(validate_register_request(&zero).is_err());
    }

    #[test]
    fn test_minted_tokens_are_unique_and_opaque() {
        let a = mint_token();
        let b = mint_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
