//! Pipeline manifest
//!
//! The `.eifl.json` document checked into a repository root. It declares the
//! pipeline name, trigger sources, required runner tags, and the ordered
//! list of shell steps. The raw JSON is kept on the pipeline row and parsed
//! on read; this module owns the model, structural validation, and the two
//! trigger/condition predicates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parsed `.eifl.json` manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Triggers>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runner_tags: Vec<String>,
    pub steps: Vec<StepSpec>,
}

/// Trigger sources for a pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<PushTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduleEntry>>,
}

/// Push trigger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,
}

/// One cron schedule entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub cron: String,
}

/// One step declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub run: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capture_sizes: Vec<String>,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Manifest parse/validation error
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("invalid manifest field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl ManifestError {
    fn field(field: &str, reason: &str) -> Self {
        ManifestError::InvalidField {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parse and validate a manifest document
pub fn parse_manifest(raw: &str) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_json::from_str(raw)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

fn validate_manifest(manifest: &Manifest) -> Result<(), ManifestError> {
    if manifest.name.trim().is_empty() {
        return Err(ManifestError::field("name", "must be a non-empty string"));
    }

    if manifest.steps.is_empty() {
        return Err(ManifestError::field("steps", "at least one step is required"));
    }

    for (i, step) in manifest.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(ManifestError::field(
                &format!("steps[{}].name", i),
                "must be a non-empty string",
            ));
        }
        if step.run.trim().is_empty() {
            return Err(ManifestError::field(
                &format!("steps[{}].run", i),
                "must be a non-empty string",
            ));
        }
    }

    if let Some(Triggers {
        schedule: Some(entries),
        ..
    }) = &manifest.triggers
    {
        for (i, entry) in entries.iter().enumerate() {
            if entry.cron.trim().is_empty() {
                return Err(ManifestError::field(
                    &format!("triggers.schedule[{}].cron", i),
                    "must be a non-empty cron expression",
                ));
            }
        }
    }

    Ok(())
}

/// Whether a push to `branch` should trigger this pipeline
///
/// Absent `triggers` means "trigger on everything"; an explicit `triggers`
/// block without `push` disables push triggering; an empty or absent
/// `branches` list matches every branch.
pub fn should_trigger_on_push(manifest: &Manifest, branch: &str) -> bool {
    let triggers = match &manifest.triggers {
        None => return true,
        Some(t) => t,
    };

    let push = match &triggers.push {
        None => return false,
        Some(p) => p,
    };

    match &push.branches {
        None => true,
        Some(patterns) if patterns.is_empty() => true,
        Some(patterns) => patterns.iter().any(|p| branch_pattern_matches(p, branch)),
    }
}

/// Match a single branch pattern: `*`, `prefix*`, `*suffix`, or a literal
pub fn branch_pattern_matches(pattern: &str, branch: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return branch.starts_with(prefix);
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return branch.ends_with(suffix);
    }
    pattern == branch
}

/// Values a step condition may reference
#[derive(Debug, Clone)]
pub struct ConditionContext {
    pub trigger: String,
    pub branch: String,
}

impl ConditionContext {
    fn lookup(&self, var: &str) -> Option<&str> {
        match var {
            "trigger" => Some(&self.trigger),
            "branch" => Some(&self.branch),
            _ => None,
        }
    }
}

/// Evaluate a step-level `if` condition
///
/// The grammar is exactly `var == 'literal'` and `var != 'literal'` with
/// optional whitespace. Anything else, including conditions naming unknown
/// variables, evaluates to false and the step is skipped. Fail-closed here
/// is stable behavior, not an error.
pub fn evaluate_step_condition(expr: &str, ctx: &ConditionContext) -> bool {
    let (var, literal, negated) = match parse_condition(expr) {
        Some(parts) => parts,
        None => return false,
    };

    let value = match ctx.lookup(var) {
        Some(v) => v,
        None => return false,
    };

    if negated {
        value != literal
    } else {
        value == literal
    }
}

fn parse_condition(expr: &str) -> Option<(&str, &str, bool)> {
    let (lhs, rhs, negated) = if let Some((lhs, rhs)) = expr.split_once("==") {
        (lhs, rhs, false)
    } else if let Some((lhs, rhs)) = expr.split_once("!=") {
        (lhs, rhs, true)
    } else {
        return None;
    };

    let var = lhs.trim();
    if var.is_empty() || !var.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let literal = rhs
        .trim()
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))?;
    if literal.contains('\'') {
        return None;
    }

    Some((var, literal, negated))
}
