//! Job execution
//!
//! Executes one dispatched run: clone the repo into a fresh workspace,
//! check out the target commit, walk the steps in order, stream their
//! output back to the server, collect emitted metrics and captured file
//! sizes, and report completion.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use eifl_client::ServerClient;
use eifl_core::domain::run::RunStatus;
use eifl_core::domain::step::StepStatus;
use eifl_core::dto::job::{JobPayload, JobStep, MetricReport};
use eifl_core::manifest::{evaluate_step_condition, ConditionContext, StepSpec};
use eifl_core::metric_line::{parse_metric_line, size_metric_key};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Flush streamed output once this many lines have accumulated
const OUTPUT_FLUSH_LINES: usize = 32;

/// Executes dispatched jobs
pub struct JobExecutor {
    config: Config,
    client: Arc<ServerClient>,
}

impl JobExecutor {
    pub fn new(config: Config, client: Arc<ServerClient>) -> Self {
        Self { config, client }
    }

    /// Execute one job end to end and report completion
    pub async fn execute(&self, job: JobPayload) -> Result<()> {
        info!("Executing run {} ({})", job.run.id, job.pipeline_config.name);

        let started = Instant::now();
        let workspace = self
            .config
            .workspace_dir
            .join(format!("run-{}", job.run.id));

        let mut metrics: Vec<MetricReport> = Vec::new();

        let succeeded = match self.prepare_workspace(&job, &workspace).await {
            Ok(()) => self.run_steps(&job, &workspace, &mut metrics).await?,
            Err(e) => {
                warn!("Workspace preparation failed for run {}: {:#}", job.run.id, e);
                self.fail_remaining_setup(&job, &e).await;
                false
            }
        };

        metrics.push(MetricReport {
            key: "total_duration_ms".to_string(),
            value: started.elapsed().as_millis() as f64,
            unit: Some("ms".to_string()),
        });

        let status = if succeeded {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };

        let response = self
            .client
            .complete_run(job.run.id, status, metrics)
            .await
            .context("Failed to report run completion")?;

        let check = response.baseline_check;
        if check.has_regressions {
            warn!(
                "Run {} finished {} with {}/{} metric(s) regressing",
                job.run.id,
                status.as_str(),
                check.regressions,
                check.checked
            );
        } else {
            info!(
                "Run {} finished {} ({} baseline(s) checked)",
                job.run.id,
                status.as_str(),
                check.checked
            );
        }

        if let Err(e) = tokio::fs::remove_dir_all(&workspace).await {
            if workspace.exists() {
                warn!("Failed to clean workspace {}: {}", workspace.display(), e);
            }
        }

        Ok(())
    }

    /// Clone the repo and check out the target commit
    async fn prepare_workspace(&self, job: &JobPayload, workspace: &Path) -> Result<()> {
        if let Some(parent) = workspace.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create workspace root")?;
        }

        let clone_url = self.resolve_clone_url(&job.repo_url);
        debug!("Cloning {} into {}", job.repo_url, workspace.display());

        run_git(&["clone", &clone_url, &workspace.to_string_lossy()], None)
            .await
            .context("git clone failed")?;

        if let Some(sha) = &job.commit_sha {
            run_git(&["checkout", "--detach", sha], Some(workspace))
                .await
                .with_context(|| format!("git checkout {} failed", sha))?;
        }

        Ok(())
    }

    /// Server-relative repo URLs resolve against the server base URL
    fn resolve_clone_url(&self, repo_url: &str) -> String {
        if repo_url.starts_with('/') {
            format!(
                "{}{}",
                self.config.server_url.trim_end_matches('/'),
                repo_url
            )
        } else {
            repo_url.to_string()
        }
    }

    /// Walk the steps in order; returns whether every executed step passed
    async fn run_steps(
        &self,
        job: &JobPayload,
        workspace: &Path,
        metrics: &mut Vec<MetricReport>,
    ) -> Result<bool> {
        let ctx = ConditionContext {
            trigger: job.run.triggered_by.as_str().to_string(),
            branch: job.run.branch.clone().unwrap_or_default(),
        };

        for (index, step) in job.steps.iter().enumerate() {
            let spec = job.pipeline_config.steps.get(index);

            if let Some(condition) = spec.and_then(|s| s.condition.as_deref()) {
                if !evaluate_step_condition(condition, &ctx) {
                    info!("Step '{}' skipped (condition not met)", step.name);
                    self.client
                        .update_step(step.id, StepStatus::Skipped, None, None)
                        .await?;
                    continue;
                }
            }

            info!("Step '{}' starting", step.name);
            self.client
                .update_step(step.id, StepStatus::Running, None, None)
                .await?;

            let exit_code = self
                .run_command(step, workspace, &job.secrets, metrics)
                .await?;

            if let Some(spec) = spec {
                self.capture_sizes(spec, workspace, metrics);
            }

            let status = if exit_code == Some(0) {
                StepStatus::Success
            } else {
                StepStatus::Failed
            };

            self.client
                .update_step(step.id, status, exit_code, None)
                .await?;

            if status == StepStatus::Failed {
                info!(
                    "Step '{}' failed (exit code {:?}); aborting run",
                    step.name, exit_code
                );
                return Ok(false);
            }

            info!("Step '{}' succeeded", step.name);
        }

        Ok(true)
    }

    /// Run one shell command, streaming stdout and collecting metric lines
    ///
    /// Returns the exit code, or None when the process was killed by a
    /// signal or could not be spawned.
    async fn run_command(
        &self,
        step: &JobStep,
        workspace: &Path,
        secrets: &HashMap<String, String>,
        metrics: &mut Vec<MetricReport>,
    ) -> Result<Option<i64>> {
        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(&step.command)
            .current_dir(workspace)
            .envs(secrets)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                self.client
                    .append_output(step.id, format!("failed to spawn command: {}\n", e))
                    .await?;
                return Ok(None);
            }
        };

        let stdout = child.stdout.take().context("child stdout missing")?;
        let mut stderr = child.stderr.take().context("child stderr missing")?;

        // stderr is drained concurrently and appended after the process
        // exits; metric lines are only recognized on stdout.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut pending = String::new();
        let mut pending_lines = 0;

        while let Some(line) = lines.next_line().await? {
            if let Some(metric) = parse_metric_line(&line) {
                debug!("Metric {} = {}", metric.key, metric.value);
                metrics.push(metric);
            }

            pending.push_str(&line);
            pending.push('\n');
            pending_lines += 1;

            if pending_lines >= OUTPUT_FLUSH_LINES {
                self.client
                    .append_output(step.id, std::mem::take(&mut pending))
                    .await?;
                pending_lines = 0;
            }
        }

        if !pending.is_empty() {
            self.client.append_output(step.id, pending).await?;
        }

        let status = child.wait().await.context("waiting for command failed")?;

        if let Ok(err_output) = stderr_task.await {
            if !err_output.is_empty() {
                self.client.append_output(step.id, err_output).await?;
            }
        }

        Ok(status.code().map(i64::from))
    }

    /// Record file sizes for the step's `capture_sizes` globs
    fn capture_sizes(&self, spec: &StepSpec, workspace: &Path, metrics: &mut Vec<MetricReport>) {
        for pattern in &spec.capture_sizes {
            let full = workspace.join(pattern);
            let entries = match glob::glob(&full.to_string_lossy()) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Invalid capture_sizes pattern '{}': {}", pattern, e);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let size = match std::fs::metadata(&entry) {
                    Ok(meta) if meta.is_file() => meta.len(),
                    _ => continue,
                };

                let rel = entry.strip_prefix(workspace).unwrap_or(&entry);
                metrics.push(MetricReport {
                    key: size_metric_key(&rel.to_string_lossy()),
                    value: size as f64,
                    unit: Some("bytes".to_string()),
                });
            }
        }
    }

    /// Mark the first pending step failed when setup never got to run it
    async fn fail_remaining_setup(&self, job: &JobPayload, err: &anyhow::Error) {
        if let Some(first) = job.steps.first() {
            let _ = self
                .client
                .update_step(
                    first.id,
                    StepStatus::Failed,
                    None,
                    Some(format!("workspace preparation failed: {:#}\n", err)),
                )
                .await;
        }
    }
}

/// Run a git command, failing on a nonzero exit
async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output().await.context("failed to execute git")?;

    if !output.status.success() {
        anyhow::bail!(
            "git {:?} exited with {}: {}",
            args,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}
