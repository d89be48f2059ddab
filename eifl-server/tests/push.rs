//! Push trigger: manifest discovery, pipeline upsert, and branch
//! filtering.

mod common;

use eifl_core::domain::run::TriggerKind;
use eifl_core::dto::push::{PushEvent, RefUpdate, ZERO_SHA};
use eifl_server::repository::{pipeline_repository, run_repository};
use eifl_server::service::push_service;

use common::{seed_repo, test_state, StubGit};

const SHA: &str = "dddddddddddddddddddddddddddddddddddddddd";

fn branch_update(branch: &str, newrev: &str) -> RefUpdate {
    RefUpdate {
        oldrev: ZERO_SHA.to_string(),
        newrev: newrev.to_string(),
        refname: format!("refs/heads/{}", branch),
    }
}

fn push_event(repo_path: &str, updates: Vec<RefUpdate>) -> PushEvent {
    PushEvent {
        repo_path: repo_path.to_string(),
        updates,
    }
}

const MANIFEST: &str = r#"{
    "name": "build",
    "triggers": {
        "push": { "branches": ["main", "release-*"] },
        "schedule": [ { "cron": "0 * * * *" } ]
    },
    "steps": [ { "name": "test", "run": "make test" } ]
}"#;

#[tokio::test]
async fn push_to_matching_branch_upserts_pipeline_and_enqueues_run() {
    let git = StubGit::default().with_file("acme/app.git", SHA, ".eifl.json", MANIFEST);
    let state = test_state(git).await;
    let (_, repo) = seed_repo(&state, "acme/app.git").await;

    let created = push_service::handle_push(
        &state,
        &push_event("acme/app.git", vec![branch_update("main", SHA)]),
    )
    .await
    .unwrap();
    assert_eq!(created, 1);

    let pipeline = pipeline_repository::find_by_repo_and_name(&state.pool, repo.id, "build")
        .await
        .unwrap()
        .expect("pipeline registered from the manifest");
    // Schedule entries in the manifest seed next_run_at.
    assert!(pipeline.next_run_at.is_some());

    let runs = run_repository::list_by_pipeline(&state.pool, pipeline.id)
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].triggered_by, TriggerKind::Push);
    assert_eq!(runs[0].commit_sha.as_deref(), Some(SHA));
    assert_eq!(runs[0].branch.as_deref(), Some("main"));
}

#[tokio::test]
async fn push_to_non_matching_branch_registers_but_does_not_run() {
    let git = StubGit::default().with_file("acme/app.git", SHA, ".eifl.json", MANIFEST);
    let state = test_state(git).await;
    let (_, repo) = seed_repo(&state, "acme/app.git").await;

    let created = push_service::handle_push(
        &state,
        &push_event("acme/app.git", vec![branch_update("develop", SHA)]),
    )
    .await
    .unwrap();
    assert_eq!(created, 0);

    // The pipeline registration still happened so schedules take effect.
    let pipeline = pipeline_repository::find_by_repo_and_name(&state.pool, repo.id, "build")
        .await
        .unwrap()
        .unwrap();

    let runs = run_repository::list_by_pipeline(&state.pool, pipeline.id)
        .await
        .unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn wildcard_branch_pattern_matches() {
    let git = StubGit::default().with_file("acme/app.git", SHA, ".eifl.json", MANIFEST);
    let state = test_state(git).await;
    seed_repo(&state, "acme/app.git").await;

    let created = push_service::handle_push(
        &state,
        &push_event("acme/app.git", vec![branch_update("release-1.0", SHA)]),
    )
    .await
    .unwrap();
    assert_eq!(created, 1);
}

#[tokio::test]
async fn deletions_tags_and_manifestless_refs_are_ignored() {
    // Only `main` has a manifest; the tag ref and the deletion do not.
    let git = StubGit::default().with_file("acme/app.git", SHA, ".eifl.json", MANIFEST);
    let state = test_state(git).await;
    seed_repo(&state, "acme/app.git").await;

    let deletion = RefUpdate {
        oldrev: SHA.to_string(),
        newrev: ZERO_SHA.to_string(),
        refname: "refs/heads/main".to_string(),
    };
    let tag = RefUpdate {
        oldrev: ZERO_SHA.to_string(),
        newrev: SHA.to_string(),
        refname: "refs/tags/v1".to_string(),
    };
    let no_manifest = branch_update("main", "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

    let created = push_service::handle_push(
        &state,
        &push_event("acme/app.git", vec![deletion, tag, no_manifest]),
    )
    .await
    .unwrap();
    assert_eq!(created, 0);
}

#[tokio::test]
async fn each_push_is_an_independent_event() {
    // Unlike the scheduler, push triggering has no duplicate suppression.
    let git = StubGit::default().with_file("acme/app.git", SHA, ".eifl.json", MANIFEST);
    let state = test_state(git).await;
    let (_, repo) = seed_repo(&state, "acme/app.git").await;

    for _ in 0..2 {
        push_service::handle_push(
            &state,
            &push_event("acme/app.git", vec![branch_update("main", SHA)]),
        )
        .await
        .unwrap();
    }

    let pipeline = pipeline_repository::find_by_repo_and_name(&state.pool, repo.id, "build")
        .await
        .unwrap()
        .unwrap();
    let runs = run_repository::list_by_pipeline(&state.pool, pipeline.id)
        .await
        .unwrap();
    assert_eq!(runs.len(), 2);
}

#[tokio::test]
async fn unknown_repo_path_is_rejected() {
    let state = test_state(StubGit::default()).await;

    let err = push_service::handle_push(
        &state,
        &push_event("nobody/home.git", vec![branch_update("main", SHA)]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, push_service::PushError::RepoNotFound(_)));
}
