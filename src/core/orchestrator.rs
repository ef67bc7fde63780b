//! Sequential multi-target deployment.
//!
//! A run is executed target by target. Each target gets one session, its
//! steps run strictly in declaration order, and the first failing step ends
//! the target and the run. Nothing is rolled back and nothing is retried.
//!
//! Two runs against the same host at the same time are undefined: no lock is
//! taken on the remote paths.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::error::{Error, RemoteCommandFailedDetails, Result};
use crate::session::{Session, SessionFactory, SessionGuard};
use crate::target::{DeployStep, DeployTarget};
use crate::utils::command::CapturedOutput;

/// Ordered list of targets executed one after another, never interleaved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentRun {
    targets: Vec<DeployTarget>,
}

impl DeploymentRun {
    pub fn new(targets: Vec<DeployTarget>) -> Self {
        Self { targets }
    }

    pub fn single(target: DeployTarget) -> Self {
        Self::new(vec![target])
    }

    /// Append another run's targets after this run's targets.
    pub fn then(mut self, other: DeploymentRun) -> Self {
        self.targets.extend(other.targets);
        self
    }

    pub fn push(&mut self, target: DeployTarget) {
        self.targets.push(target);
    }

    pub fn targets(&self) -> &[DeployTarget] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Drop every target before the first one deploying to `host_alias`.
    /// Used to resume a run manually after a failure.
    pub fn starting_from(self, host_alias: &str) -> Result<Self> {
        let Some(position) = self
            .targets
            .iter()
            .position(|t| t.host_alias() == host_alias)
        else {
            let available = self
                .targets
                .iter()
                .map(|t| t.host_alias().to_string())
                .collect();
            return Err(Error::host_not_found(host_alias, available));
        };

        Ok(Self {
            targets: self.targets.into_iter().skip(position).collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub index: usize,
    pub op: String,
    pub description: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CapturedOutput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub host_alias: String,
    pub remote_root_dir: String,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub targets: usize,
    pub steps: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
    pub summary: RunSummary,
}

/// Executes deployment runs against sessions from `factory`.
pub struct Orchestrator<'a> {
    factory: &'a dyn SessionFactory,
    preflight: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(factory: &'a dyn SessionFactory) -> Self {
        Self {
            factory,
            preflight: true,
        }
    }

    /// Skip the local-source check that normally runs before a target's
    /// session is opened. Missing sources then fail at their copy step.
    pub fn without_preflight(mut self) -> Self {
        self.preflight = false;
        self
    }

    /// Run every target in order. Returns at the first failing target
    /// without touching the targets after it.
    pub fn run(&self, run: &DeploymentRun) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(run.targets().len());

        for target in run.targets() {
            reports.push(self.run_target(target)?);
        }

        let steps = reports.iter().map(|r| r.steps.len()).sum();
        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            summary: RunSummary {
                targets: reports.len(),
                steps,
            },
            targets: reports,
        })
    }

    /// Run one target's steps inside a single session.
    pub fn run_target(&self, target: &DeployTarget) -> Result<TargetReport> {
        let alias = target.host_alias();
        let started = Instant::now();

        if self.preflight {
            preflight(target)?;
        }

        log_status!(
            "deploy",
            "Opening session to '{}' ({} steps)",
            alias,
            target.operations().len()
        );
        let session = self
            .factory
            .open(alias)
            .map_err(|cause| Error::deploy_failed(alias, None, None, cause))?;
        let mut guard = SessionGuard::new(session);

        let mut steps = Vec::with_capacity(target.operations().len());
        for (index, step) in target.operations().iter().enumerate() {
            log_status!(
                "deploy",
                "[{}] {}/{}: {}",
                alias,
                index + 1,
                target.operations().len(),
                step
            );
            let report = execute_step(guard.session(), index, step).map_err(|cause| {
                Error::deploy_failed(alias, Some(index), Some(step.to_string()), cause)
            })?;
            steps.push(report);
        }

        drop(guard);
        log_status!("deploy", "Finished '{}'", alias);

        Ok(TargetReport {
            host_alias: alias.to_string(),
            remote_root_dir: target.remote_root_dir().to_string(),
            steps,
            duration_ms: elapsed_ms(started),
        })
    }
}

/// Check that every local copy source exists before any remote operation
/// for `target` begins.
pub fn preflight(target: &DeployTarget) -> Result<()> {
    for (index, step) in target.operations().iter().enumerate() {
        if let Some(local) = step.local_source() {
            if !local.exists() {
                let cause = Error::config_local_path_missing(
                    target.host_alias(),
                    index,
                    local.display().to_string(),
                );
                return Err(Error::deploy_failed(
                    target.host_alias(),
                    Some(index),
                    Some(step.to_string()),
                    cause,
                ));
            }
        }
    }
    Ok(())
}

fn execute_step(session: &mut dyn Session, index: usize, step: &DeployStep) -> Result<StepReport> {
    let started = Instant::now();

    let output = match step {
        DeployStep::RemoveRemotePath { path } => {
            session.remove_path(path)?;
            None
        }
        DeployStep::CreateRemoteDir { path } => {
            session.create_dir(path)?;
            None
        }
        DeployStep::CopyToRemote { local, remote } => {
            if !local.exists() {
                return Err(Error::step_execution_failed(
                    "copy",
                    local.display().to_string(),
                    "Local source does not exist",
                ));
            }
            session.copy_to(local, remote)?;
            None
        }
        DeployStep::RunRemoteCommand { command } => {
            let output = session.run_command(command)?;
            if !output.success() {
                return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
                    command: command.clone(),
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    host_alias: session.host_alias().to_string(),
                }));
            }
            Some(output)
        }
    };

    Ok(StepReport {
        index,
        op: step.kind().to_string(),
        description: step.to_string(),
        duration_ms: elapsed_ms(started),
        output,
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
