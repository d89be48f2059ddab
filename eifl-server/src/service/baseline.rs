//! Baseline Service
//!
//! Compares a run's metrics against the pipeline's baselines and maintains
//! baseline rows.

use std::collections::HashMap;

use eifl_core::domain::baseline::Baseline;
use eifl_core::dto::job::{BaselineCheck, MetricReport};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::{baseline_repository, metric_repository, run_repository};

pub const DEFAULT_TOLERANCE_PCT: f64 = 10.0;

/// Service error type
#[derive(Debug)]
pub enum BaselineError {
    RunNotFound(Uuid),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for BaselineError {
    fn from(err: sqlx::Error) -> Self {
        BaselineError::DatabaseError(err)
    }
}

/// Compare reported metrics against the pipeline's baselines
///
/// Only keys with both a baseline and a reported value count as checked;
/// each out-of-tolerance pair counts as a regression and is logged.
pub async fn compare(
    pool: &SqlitePool,
    pipeline_id: Uuid,
    metrics: &[MetricReport],
) -> Result<BaselineCheck, sqlx::Error> {
    let baselines: HashMap<String, Baseline> =
        baseline_repository::list_by_pipeline(pool, pipeline_id)
            .await?
            .into_iter()
            .map(|b| (b.key.clone(), b))
            .collect();

    let mut checked = 0;
    let mut regressions = 0;

    for metric in metrics {
        let baseline = match baselines.get(&metric.key) {
            Some(b) => b,
            None => continue,
        };

        checked += 1;
        let deviation = baseline.deviation_pct(metric.value);

        if deviation > baseline.tolerance_pct {
            regressions += 1;
            tracing::warn!(
                "Regression on pipeline {} metric '{}': {} vs baseline {} ({:.1}% > {:.1}%)",
                pipeline_id,
                metric.key,
                metric.value,
                baseline.baseline_value,
                deviation,
                baseline.tolerance_pct
            );
        }
    }

    Ok(BaselineCheck {
        checked,
        regressions,
        has_regressions: regressions > 0,
    })
}

/// Upsert a single baseline value
pub async fn upsert(
    pool: &SqlitePool,
    pipeline_id: Uuid,
    key: &str,
    baseline_value: f64,
    tolerance_pct: Option<f64>,
) -> Result<Baseline, sqlx::Error> {
    baseline_repository::upsert(
        pool,
        pipeline_id,
        key,
        baseline_value,
        tolerance_pct.unwrap_or(DEFAULT_TOLERANCE_PCT),
    )
    .await
}

/// Adopt every metric of a prior run as the pipeline's baselines
///
/// Existing tolerances are preserved; new keys get the default tolerance.
/// When a run recorded a key more than once the last value wins.
pub async fn adopt_from_run(
    pool: &SqlitePool,
    pipeline_id: Uuid,
    run_id: Uuid,
) -> Result<Vec<Baseline>, BaselineError> {
    let run = run_repository::find_by_id(pool, run_id)
        .await?
        .ok_or(BaselineError::RunNotFound(run_id))?;

    let existing: HashMap<String, f64> = baseline_repository::list_by_pipeline(pool, pipeline_id)
        .await?
        .into_iter()
        .map(|b| (b.key, b.tolerance_pct))
        .collect();

    let mut latest: HashMap<String, f64> = HashMap::new();
    for metric in metric_repository::list_by_run(pool, run.id).await? {
        latest.insert(metric.key, metric.value);
    }

    let mut adopted = Vec::with_capacity(latest.len());
    for (key, value) in latest {
        let tolerance = existing.get(&key).copied().unwrap_or(DEFAULT_TOLERANCE_PCT);
        adopted.push(baseline_repository::upsert(pool, pipeline_id, &key, value, tolerance).await?);
    }

    tracing::info!(
        "Adopted {} baseline(s) for pipeline {} from run {}",
        adopted.len(),
        pipeline_id,
        run_id
    );

    Ok(adopted)
}
