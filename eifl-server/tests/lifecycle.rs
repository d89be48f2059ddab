//! Run lifecycle: completion callbacks, baseline checks, cancellation,
//! and step updates.

mod common;

use eifl_core::domain::run::{Run, RunStatus, TriggerKind};
use eifl_core::domain::step::StepStatus;
use eifl_core::dto::job::{CompleteRunRequest, MetricReport, StepUpdateRequest};
use eifl_core::manifest;
use eifl_server::repository::{metric_repository, run_repository, step_repository};
use eifl_server::service::lifecycle::LifecycleError;
use eifl_server::service::{baseline_service, dispatch_service, lifecycle_service};
use eifl_server::AppState;

use common::{manifest as manifest_json, seed_pipeline, seed_repo, seed_runner, test_state, StubGit};

async fn seed_run(state: &AppState) -> (uuid::Uuid, Run) {
    let (_, repo) = seed_repo(state, &format!("r-{}.git", uuid::Uuid::new_v4())).await;
    let config = manifest_json("build", "");
    let pipeline = seed_pipeline(state, repo.id, &config, None).await;
    let parsed = manifest::parse_manifest(&config).unwrap();

    let run = lifecycle_service::create_run(
        &state.pool,
        pipeline.id,
        &parsed,
        TriggerKind::Manual,
        Some("cccccccccccccccccccccccccccccccccccccccc"),
        Some("main"),
    )
    .await
    .unwrap();

    (pipeline.id, run)
}

fn metric(key: &str, value: f64) -> MetricReport {
    MetricReport {
        key: key.to_string(),
        value,
        unit: None,
    }
}

#[tokio::test]
async fn completion_records_metrics_and_flags_regressions() {
    let state = test_state(StubGit::default()).await;
    let (pipeline_id, run) = seed_run(&state).await;
    let runner = seed_runner(&state, "worker", &[], 1).await;

    baseline_service::upsert(&state.pool, pipeline_id, "total_duration_ms", 1000.0, Some(10.0))
        .await
        .unwrap();

    // Dispatch so the run is running and the runner holds a slot.
    let job = dispatch_service::poll_for_job(&state, &runner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.run.id, run.id);

    let check = lifecycle_service::complete_run(
        &state.pool,
        runner.id,
        &CompleteRunRequest {
            run_id: run.id,
            status: RunStatus::Success,
            metrics: vec![metric("total_duration_ms", 1200.0)],
        },
    )
    .await
    .unwrap();

    // 1200 vs 1000 is a 20% deviation against a 10% tolerance.
    assert_eq!(check.checked, 1);
    assert_eq!(check.regressions, 1);
    assert!(check.has_regressions);

    let reloaded = run_repository::find_by_id(&state.pool, run.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, RunStatus::Success);
    assert!(reloaded.started_at.is_some());
    assert!(reloaded.finished_at.is_some());

    let metrics = metric_repository::list_by_run(&state.pool, run.id)
        .await
        .unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].value, 1200.0);
}

#[tokio::test]
async fn completion_within_tolerance_reports_no_regression() {
    let state = test_state(StubGit::default()).await;
    let (pipeline_id, run) = seed_run(&state).await;
    let runner = seed_runner(&state, "worker", &[], 1).await;

    baseline_service::upsert(&state.pool, pipeline_id, "total_duration_ms", 1000.0, Some(10.0))
        .await
        .unwrap();

    dispatch_service::poll_for_job(&state, &runner).await.unwrap();

    let check = lifecycle_service::complete_run(
        &state.pool,
        runner.id,
        &CompleteRunRequest {
            run_id: run.id,
            status: RunStatus::Success,
            metrics: vec![metric("total_duration_ms", 1100.0), metric("unbaselined", 5.0)],
        },
    )
    .await
    .unwrap();

    assert_eq!(check.checked, 1);
    assert_eq!(check.regressions, 0);
    assert!(!check.has_regressions);
}

#[tokio::test]
async fn completion_rejects_non_terminal_status() {
    let state = test_state(StubGit::default()).await;
    let (_, run) = seed_run(&state).await;
    let runner = seed_runner(&state, "worker", &[], 1).await;

    let err = lifecycle_service::complete_run(
        &state.pool,
        runner.id,
        &CompleteRunRequest {
            run_id: run.id,
            status: RunStatus::Cancelled,
            metrics: vec![],
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LifecycleError::ValidationError(_)));
}

#[tokio::test]
async fn cancelled_run_is_not_revived_by_completion() {
    let state = test_state(StubGit::default()).await;
    let (_, run) = seed_run(&state).await;
    let runner = seed_runner(&state, "worker", &[], 1).await;

    dispatch_service::poll_for_job(&state, &runner).await.unwrap();
    lifecycle_service::cancel_run(&state.pool, run.id).await.unwrap();

    let check = lifecycle_service::complete_run(
        &state.pool,
        runner.id,
        &CompleteRunRequest {
            run_id: run.id,
            status: RunStatus::Success,
            metrics: vec![metric("total_duration_ms", 10.0)],
        },
    )
    .await
    .unwrap();
    assert_eq!(check.checked, 0);

    let reloaded = run_repository::find_by_id(&state.pool, run.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, RunStatus::Cancelled);

    // The runner's slot was still released.
    let runner = eifl_server::repository::runner_repository::find_by_id(&state.pool, runner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(runner.active_jobs, 0);
}

#[tokio::test]
async fn cancel_rejects_terminal_runs() {
    let state = test_state(StubGit::default()).await;
    let (_, run) = seed_run(&state).await;

    let cancelled = lifecycle_service::cancel_run(&state.pool, run.id).await.unwrap();
    assert_eq!(cancelled.status, RunStatus::Cancelled);
    assert!(cancelled.finished_at.is_some());

    let err = lifecycle_service::cancel_run(&state.pool, run.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::PreconditionFailed(_)));
}

#[tokio::test]
async fn step_updates_stamp_timestamps_and_append_output() {
    let state = test_state(StubGit::default()).await;
    let (_, run) = seed_run(&state).await;

    let steps = step_repository::list_by_run(&state.pool, run.id).await.unwrap();
    let step = &steps[0];

    lifecycle_service::update_step(
        &state.pool,
        &StepUpdateRequest {
            step_id: step.id,
            status: StepStatus::Running,
            exit_code: None,
            output: None,
        },
    )
    .await
    .unwrap();

    lifecycle_service::append_step_output(&state.pool, step.id, "line one\n")
        .await
        .unwrap();
    lifecycle_service::append_step_output(&state.pool, step.id, "line two\n")
        .await
        .unwrap();

    lifecycle_service::update_step(
        &state.pool,
        &StepUpdateRequest {
            step_id: step.id,
            status: StepStatus::Success,
            exit_code: Some(0),
            output: Some("done\n".to_string()),
        },
    )
    .await
    .unwrap();

    let reloaded = step_repository::find_by_id(&state.pool, step.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, StepStatus::Success);
    assert_eq!(reloaded.exit_code, Some(0));
    assert_eq!(reloaded.output, "line one\nline two\ndone\n");
    assert!(reloaded.started_at.is_some());
    assert!(reloaded.finished_at.is_some());
}

#[tokio::test]
async fn skipped_step_is_terminal_without_exit_code() {
    let state = test_state(StubGit::default()).await;
    let (_, run) = seed_run(&state).await;

    let steps = step_repository::list_by_run(&state.pool, run.id).await.unwrap();

    lifecycle_service::update_step(
        &state.pool,
        &StepUpdateRequest {
            step_id: steps[0].id,
            status: StepStatus::Skipped,
            exit_code: None,
            output: None,
        },
    )
    .await
    .unwrap();

    let reloaded = step_repository::find_by_id(&state.pool, steps[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, StepStatus::Skipped);
    assert!(reloaded.exit_code.is_none());
    assert!(reloaded.started_at.is_none());
    assert!(reloaded.finished_at.is_some());
}
