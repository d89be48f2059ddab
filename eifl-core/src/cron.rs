//! Cron evaluation
//!
//! Classic five-field cron (minute hour day-of-month month day-of-week),
//! evaluated in UTC. The underlying `cron` crate wants a seconds field, so
//! expressions are pinned to second zero before parsing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Raised for expressions that are not valid five-field cron
#[derive(Debug, Error)]
#[error("invalid cron expression '{expr}': {reason}")]
pub struct InvalidCronError {
    pub expr: String,
    pub reason: String,
}

/// Compute the next UTC firing of `expr` strictly after `reference`
pub fn next_after(
    expr: &str,
    reference: DateTime<Utc>,
) -> Result<DateTime<Utc>, InvalidCronError> {
    let fields = expr.split_whitespace().count();
    if fields != 5 {
        return Err(InvalidCronError {
            expr: expr.to_string(),
            reason: format!("expected 5 fields, found {}", fields),
        });
    }

    let schedule =
        cron::Schedule::from_str(&format!("0 {}", expr)).map_err(|e| InvalidCronError {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;

    schedule
        .after(&reference)
        .next()
        .ok_or_else(|| InvalidCronError {
            expr: expr.to_string(),
            reason: "no future occurrence".to_string(),
        })
}
