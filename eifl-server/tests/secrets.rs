//! Secret store: scope merge, decrypt-at-dispatch, and the error
//! taxonomy.

mod common;

use std::sync::Arc;

use eifl_core::domain::secret::SecretScope;
use eifl_core::dto::secret::SetSecret;
use eifl_server::crypto::SecretCipherHandle;
use eifl_server::service::secret::SecretError;
use eifl_server::service::secret_service;

use common::{seed_repo, test_state, StubGit};

fn set(name: &str, value: &str) -> SetSecret {
    SetSecret {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[tokio::test]
async fn repo_scope_overrides_project_scope() {
    let state = test_state(StubGit::default()).await;
    let (project, repo) = seed_repo(&state, "acme/app.git").await;

    secret_service::set_secret(
        &state.pool,
        &state.secrets,
        SecretScope::Project,
        project.id,
        &set("API_KEY", "project-level"),
    )
    .await
    .unwrap();
    secret_service::set_secret(
        &state.pool,
        &state.secrets,
        SecretScope::Project,
        project.id,
        &set("SHARED_TOKEN", "everyone"),
    )
    .await
    .unwrap();
    secret_service::set_secret(
        &state.pool,
        &state.secrets,
        SecretScope::Repo,
        repo.id,
        &set("API_KEY", "repo-level"),
    )
    .await
    .unwrap();

    let merged =
        secret_service::merged_for_dispatch(&state.pool, &state.secrets, project.id, repo.id)
            .await
            .unwrap();

    assert_eq!(merged.len(), 2);
    assert_eq!(merged.get("API_KEY").map(String::as_str), Some("repo-level"));
    assert_eq!(
        merged.get("SHARED_TOKEN").map(String::as_str),
        Some("everyone")
    );
}

#[tokio::test]
async fn listing_exposes_names_only() {
    let state = test_state(StubGit::default()).await;
    let (project, _) = seed_repo(&state, "acme/app.git").await;

    secret_service::set_secret(
        &state.pool,
        &state.secrets,
        SecretScope::Project,
        project.id,
        &set("DEPLOY_KEY", "v"),
    )
    .await
    .unwrap();

    let infos = secret_service::list_secrets(&state.pool, SecretScope::Project, project.id)
        .await
        .unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].name, "DEPLOY_KEY");

    let json = serde_json::to_string(&infos).unwrap();
    assert!(!json.contains("v\""));
    assert!(!json.contains("encrypted"));
}

#[tokio::test]
async fn duplicate_name_at_scope_conflicts() {
    let state = test_state(StubGit::default()).await;
    let (project, _) = seed_repo(&state, "acme/app.git").await;

    secret_service::set_secret(
        &state.pool,
        &state.secrets,
        SecretScope::Project,
        project.id,
        &set("API_KEY", "one"),
    )
    .await
    .unwrap();

    let err = secret_service::set_secret(
        &state.pool,
        &state.secrets,
        SecretScope::Project,
        project.id,
        &set("API_KEY", "two"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SecretError::Conflict(_)));
}

#[tokio::test]
async fn invalid_names_are_rejected() {
    let state = test_state(StubGit::default()).await;
    let (project, _) = seed_repo(&state, "acme/app.git").await;

    for name in ["api_key", "2KEY", "_X", "A-B", ""] {
        let err = secret_service::set_secret(
            &state.pool,
            &state.secrets,
            SecretScope::Project,
            project.id,
            &set(name, "v"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SecretError::ValidationError(_)), "{}", name);
    }
}

#[tokio::test]
async fn missing_key_reports_not_configured() {
    let state = test_state(StubGit::default()).await;
    let (project, _) = seed_repo(&state, "acme/app.git").await;

    let unconfigured = Arc::new(SecretCipherHandle::with_key(None));

    let err = secret_service::set_secret(
        &state.pool,
        &unconfigured,
        SecretScope::Project,
        project.id,
        &set("API_KEY", "v"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SecretError::NotConfigured(_)));
}

#[tokio::test]
async fn dispatch_merge_survives_missing_key() {
    let state = test_state(StubGit::default()).await;
    let (project, repo) = seed_repo(&state, "acme/app.git").await;

    secret_service::set_secret(
        &state.pool,
        &state.secrets,
        SecretScope::Project,
        project.id,
        &set("API_KEY", "v"),
    )
    .await
    .unwrap();

    // A server restarted without the key omits secrets but still
    // dispatches.
    let unconfigured = SecretCipherHandle::with_key(None);
    let merged = secret_service::merged_for_dispatch(&state.pool, &unconfigured, project.id, repo.id)
        .await
        .unwrap();
    assert!(merged.is_empty());
}

#[tokio::test]
async fn deleting_missing_secret_is_not_found() {
    let state = test_state(StubGit::default()).await;
    let (project, _) = seed_repo(&state, "acme/app.git").await;

    let err =
        secret_service::delete_secret(&state.pool, SecretScope::Project, project.id, "NOPE")
            .await
            .unwrap_err();
    assert!(matches!(err, SecretError::SecretNotFound(_)));
}
