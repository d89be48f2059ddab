//! Secret Service
//!
//! Secret CRUD plus the dispatch-time merge. Values are encrypted before
//! they reach the repository and only decrypted again while a job payload
//! is being materialized.

use std::collections::HashMap;

use eifl_core::domain::secret::{is_valid_secret_name, SecretScope};
use eifl_core::dto::secret::{SecretInfo, SetSecret};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::crypto::{CryptoError, SecretCipherHandle};
use crate::repository::{project_repository, repo_repository, secret_repository};

/// Service error type
#[derive(Debug)]
pub enum SecretError {
    NotConfigured(String),
    ScopeNotFound(Uuid),
    SecretNotFound(String),
    Conflict(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for SecretError {
    fn from(err: sqlx::Error) -> Self {
        SecretError::DatabaseError(err)
    }
}

impl From<CryptoError> for SecretError {
    fn from(err: CryptoError) -> Self {
        SecretError::NotConfigured(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Store a new secret at a scope
pub async fn set_secret(
    pool: &SqlitePool,
    cipher: &SecretCipherHandle,
    scope: SecretScope,
    scope_id: Uuid,
    req: &SetSecret,
) -> Result<SecretInfo> {
    if !is_valid_secret_name(&req.name) {
        return Err(SecretError::ValidationError(format!(
            "invalid secret name '{}': must match [A-Z][A-Z0-9_]*",
            req.name
        )));
    }

    ensure_scope_exists(pool, scope, scope_id).await?;

    let cipher = cipher.get().await?;
    let sealed = cipher.encrypt(&req.value).map_err(|e| match e {
        CryptoError::Encrypt => SecretError::ValidationError("encryption failed".to_string()),
        other => SecretError::NotConfigured(other.to_string()),
    })?;

    let secret = secret_repository::create(
        pool,
        scope,
        scope_id,
        &req.name,
        &sealed.ciphertext,
        &sealed.iv,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            SecretError::Conflict(format!(
                "secret '{}' already exists at this scope",
                req.name
            ))
        } else {
            SecretError::DatabaseError(e)
        }
    })?;

    tracing::info!(
        "Secret '{}' stored at {} scope {}",
        secret.name,
        scope.as_str(),
        scope_id
    );

    Ok(secret.into())
}

/// List secret names at a scope (values are never returned)
pub async fn list_secrets(
    pool: &SqlitePool,
    scope: SecretScope,
    scope_id: Uuid,
) -> Result<Vec<SecretInfo>> {
    ensure_scope_exists(pool, scope, scope_id).await?;

    let secrets = secret_repository::list_by_scope(pool, scope, scope_id).await?;
    Ok(secrets.into_iter().map(SecretInfo::from).collect())
}

/// Delete a secret by name
pub async fn delete_secret(
    pool: &SqlitePool,
    scope: SecretScope,
    scope_id: Uuid,
    name: &str,
) -> Result<()> {
    let deleted = secret_repository::delete(pool, scope, scope_id, name).await?;
    if !deleted {
        return Err(SecretError::SecretNotFound(name.to_string()));
    }

    tracing::info!("Secret '{}' deleted from {} scope {}", name, scope.as_str(), scope_id);

    Ok(())
}

/// Decrypted secret map for a dispatch
///
/// Project-scoped secrets first, repo-scoped secrets override by name. A
/// secret that fails to decrypt is logged and omitted; an unconfigured
/// cipher omits them all. The job always proceeds.
pub async fn merged_for_dispatch(
    pool: &SqlitePool,
    cipher: &SecretCipherHandle,
    project_id: Uuid,
    repo_id: Uuid,
) -> std::result::Result<HashMap<String, String>, sqlx::Error> {
    let mut merged = Vec::new();
    merged.extend(secret_repository::list_by_scope(pool, SecretScope::Project, project_id).await?);
    merged.extend(secret_repository::list_by_scope(pool, SecretScope::Repo, repo_id).await?);

    if merged.is_empty() {
        return Ok(HashMap::new());
    }

    let cipher = match cipher.get().await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Secrets omitted from dispatch: {}", e);
            return Ok(HashMap::new());
        }
    };

    let mut plain = HashMap::new();
    for secret in merged {
        match cipher.decrypt(&secret.encrypted_value, &secret.iv) {
            // Later (repo-scoped) entries override earlier ones by name.
            Ok(value) => {
                plain.insert(secret.name, value);
            }
            Err(e) => {
                tracing::warn!("Skipping secret '{}': {}", secret.name, e);
            }
        }
    }

    Ok(plain)
}

async fn ensure_scope_exists(
    pool: &SqlitePool,
    scope: SecretScope,
    scope_id: Uuid,
) -> Result<()> {
    let exists = match scope {
        SecretScope::Project => project_repository::find_by_id(pool, scope_id)
            .await?
            .is_some(),
        SecretScope::Repo => repo_repository::find_by_id(pool, scope_id).await?.is_some(),
    };

    if !exists {
        return Err(SecretError::ScopeNotFound(scope_id));
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}
