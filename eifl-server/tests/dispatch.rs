//! Dispatcher behavior: tag eligibility, the reservation race, and the
//! concurrency cap.

mod common;

use eifl_core::domain::run::{RunStatus, TriggerKind};
use eifl_core::domain::runner::RunnerStatus;
use eifl_core::dto::job::CompleteRunRequest;
use eifl_core::manifest;
use eifl_server::repository::{run_repository, runner_repository, step_repository};
use eifl_server::service::{dispatch_service, lifecycle_service};
use eifl_server::AppState;

use common::{manifest as manifest_json, seed_pipeline, seed_repo, seed_runner, test_state, StubGit};

const SHA: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

async fn seed_pending_run(state: &AppState, config: &str) -> eifl_core::domain::run::Run {
    let (_, repo) = seed_repo(state, &format!("r-{}.git", uuid::Uuid::new_v4())).await;
    let pipeline = seed_pipeline(state, repo.id, config, None).await;
    let parsed = manifest::parse_manifest(config).unwrap();

    lifecycle_service::create_run(
        &state.pool,
        pipeline.id,
        &parsed,
        TriggerKind::Push,
        Some(SHA),
        Some("main"),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn dispatch_prefers_tag_satisfying_runner() {
    let state = test_state(StubGit::default()).await;
    let config = manifest_json("build", r#""runner_tags": ["linux", "perf"]"#);
    let run = seed_pending_run(&state, &config).await;

    let a = seed_runner(&state, "runner-a", &["linux"], 1).await;
    let b = seed_runner(&state, "runner-b", &["linux", "perf"], 1).await;

    // A lacks the perf tag: no job for it.
    let job_a = dispatch_service::poll_for_job(&state, &a).await.unwrap();
    assert!(job_a.is_none());

    let job_b = dispatch_service::poll_for_job(&state, &b).await.unwrap();
    let job_b = job_b.expect("runner-b should receive the job");
    assert_eq!(job_b.run.id, run.id);
    assert_eq!(job_b.run.status, RunStatus::Running);
    assert!(job_b.run.started_at.is_some());

    let b = runner_repository::find_by_id(&state.pool, b.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b.active_jobs, 1);
    assert_eq!(b.status, RunnerStatus::Busy);

    let a = runner_repository::find_by_id(&state.pool, a.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.active_jobs, 0);
}

#[tokio::test]
async fn untagged_pipeline_matches_any_runner() {
    let state = test_state(StubGit::default()).await;
    let run = seed_pending_run(&state, &manifest_json("build", "")).await;

    let bare = seed_runner(&state, "bare", &[], 1).await;
    let job = dispatch_service::poll_for_job(&state, &bare).await.unwrap();
    assert_eq!(job.unwrap().run.id, run.id);
}

#[tokio::test]
async fn concurrent_polls_dispatch_exactly_once() {
    let state = test_state(StubGit::default()).await;
    let run = seed_pending_run(&state, &manifest_json("build", "")).await;

    let a = seed_runner(&state, "racer-a", &[], 1).await;
    let b = seed_runner(&state, "racer-b", &[], 1).await;

    let (job_a, job_b) = tokio::join!(
        dispatch_service::poll_for_job(&state, &a),
        dispatch_service::poll_for_job(&state, &b),
    );
    let job_a = job_a.unwrap();
    let job_b = job_b.unwrap();

    // Exactly one winner.
    assert_eq!(job_a.is_some() as u8 + job_b.is_some() as u8, 1);

    let reloaded = run_repository::find_by_id(&state.pool, run.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, RunStatus::Running);

    let a = runner_repository::find_by_id(&state.pool, a.id)
        .await
        .unwrap()
        .unwrap();
    let b = runner_repository::find_by_id(&state.pool, b.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.active_jobs + b.active_jobs, 1);
}

#[tokio::test]
async fn concurrency_cap_holds_until_a_run_completes() {
    let state = test_state(StubGit::default()).await;
    let config = manifest_json("build", "");

    // Millisecond timestamps break FIFO ties by row id, so space the
    // creations out to make the dispatch order deterministic.
    seed_pending_run(&state, &config).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    seed_pending_run(&state, &config).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let third = seed_pending_run(&state, &config).await;

    let runner = seed_runner(&state, "worker", &[], 2).await;

    let first = dispatch_service::poll_for_job(&state, &runner)
        .await
        .unwrap()
        .expect("first poll gets a job");

    let runner = runner_repository::find_by_id(&state.pool, runner.id)
        .await
        .unwrap()
        .unwrap();
    let _second = dispatch_service::poll_for_job(&state, &runner)
        .await
        .unwrap()
        .expect("second poll gets a job");

    let runner = runner_repository::find_by_id(&state.pool, runner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(runner.active_jobs, 2);
    assert_eq!(runner.status, RunnerStatus::Busy);

    // At capacity: nothing handed out.
    let none = dispatch_service::poll_for_job(&state, &runner).await.unwrap();
    assert!(none.is_none());

    // Completing one job frees a slot and the third run dispatches.
    lifecycle_service::complete_run(
        &state.pool,
        runner.id,
        &CompleteRunRequest {
            run_id: first.run.id,
            status: RunStatus::Success,
            metrics: vec![],
        },
    )
    .await
    .unwrap();

    let runner = runner_repository::find_by_id(&state.pool, runner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(runner.active_jobs, 1);
    assert_eq!(runner.status, RunnerStatus::Online);

    let job = dispatch_service::poll_for_job(&state, &runner)
        .await
        .unwrap()
        .expect("freed capacity dispatches the third run");
    assert_eq!(job.run.id, third.id);
}

#[tokio::test]
async fn payload_carries_steps_in_declared_order() {
    let state = test_state(StubGit::default()).await;
    let config = r#"{
        "name": "ordered",
        "steps": [
            { "name": "first", "run": "echo 1" },
            { "name": "second", "run": "echo 2" },
            { "name": "third", "run": "echo 3" }
        ]
    }"#;
    let run = seed_pending_run(&state, config).await;

    let runner = seed_runner(&state, "worker", &[], 1).await;
    let job = dispatch_service::poll_for_job(&state, &runner)
        .await
        .unwrap()
        .unwrap();

    let names: Vec<_> = job.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);

    let steps = step_repository::list_by_run(&state.pool, run.id).await.unwrap();
    assert_eq!(steps.len(), 3);
    assert!(steps.windows(2).all(|w| w[0].seq < w[1].seq));
}
