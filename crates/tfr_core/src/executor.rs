//! Bounded-parallel execution of all targets in a run.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ExecutorSettings;
use crate::context::RunContext;
use crate::error::{CoreError, CoreResult, TargetFailure};
use crate::model::{RunInput, Target};
use crate::pipeline;

/// How a single target ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Succeeded,
    Failed(TargetFailure),
    /// Cancelled before it was admitted.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub name: String,
    pub status: TargetStatus,
}

/// Outcomes of a run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub outcomes: Vec<TargetOutcome>,
}

impl RunResult {
    /// Targets that did not succeed, including skipped ones.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status != TargetStatus::Succeeded)
            .count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetFailure> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            TargetStatus::Failed(failure) => Some(failure),
            _ => None,
        })
    }

    pub fn into_result(self) -> CoreResult<()> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(CoreError::TargetsFailed {
                failed,
                total: self.total(),
            }),
        }
    }
}

/// A target's private directory, removed when dropped.
#[derive(Debug)]
pub struct TargetWorkspace {
    path: PathBuf,
}

impl TargetWorkspace {
    /// Create `<root>/<name>`; an existing directory is an error.
    pub fn create(root: &Path, name: &str) -> CoreResult<Self> {
        let path = root.join(name);
        fs::create_dir(&path).map_err(|source| CoreError::Workdir {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TargetWorkspace {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Unable to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Runs every target of a run input with bounded parallelism.
pub struct Executor {
    ctx: Arc<RunContext>,
    settings: ExecutorSettings,
}

impl Executor {
    pub fn new(ctx: Arc<RunContext>, settings: ExecutorSettings) -> Self {
        Self { ctx, settings }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Run all targets. Only setup problems are returned as errors;
    /// per-target failures are reported in the [`RunResult`].
    ///
    /// After `cancel` fires no new target is admitted, and targets still
    /// running once the shutdown grace has passed are dropped, which kills
    /// their child processes and removes their workspaces.
    pub async fn run(&self, input: RunInput, cancel: CancellationToken) -> CoreResult<RunResult> {
        input.validate()?;

        let root = self.settings.workdir.clone();
        fs::create_dir_all(&root).map_err(|source| CoreError::Workdir {
            path: root.clone(),
            source,
        })?;

        let limit = self.settings.parallelism.max(1);
        info!(
            "Running {} targets (parallelism {}, dry run: {})",
            input.repos.len(),
            limit,
            input.dry_run
        );

        let sem = Arc::new(Semaphore::new(limit));
        let dry_run = input.dry_run;
        let grace = self.settings.shutdown_grace;
        let mut tasks = Vec::with_capacity(input.repos.len());

        for target in input.repos {
            let name = target.name.clone();
            let ctx = Arc::clone(&self.ctx);
            let sem = Arc::clone(&sem);
            let cancel = cancel.clone();
            let root = root.clone();

            let task = tokio::spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return TargetStatus::Skipped,
                    permit = sem.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return TargetStatus::Skipped,
                    },
                };
                tokio::select! {
                    status = run_one(&ctx, &target, &root, dry_run) => status,
                    _ = grace_expired(&cancel, grace) => {
                        warn!("Abandoning {} {:?} after shutdown signal", target.name, grace);
                        TargetStatus::Failed(TargetFailure::new(
                            &target.name,
                            "interrupted by shutdown signal",
                        ))
                    }
                }
            });
            tasks.push((name, task));
        }

        let mut result = RunResult::default();
        for (name, task) in tasks {
            let status = match task.await {
                Ok(status) => status,
                Err(e) => TargetStatus::Failed(TargetFailure::new(
                    &name,
                    format!("target task aborted: {}", e),
                )),
            };
            match &status {
                TargetStatus::Succeeded => info!("Target {} succeeded", name),
                TargetStatus::Failed(failure) => error!("{}", failure),
                TargetStatus::Skipped => warn!("Target {} skipped", name),
            }
            result.outcomes.push(TargetOutcome { name, status });
        }

        info!(
            "Finished run: {}/{} targets did not succeed",
            result.failed(),
            result.total()
        );
        Ok(result)
    }
}

/// Resolves once `grace` has passed since cancellation.
async fn grace_expired(cancel: &CancellationToken, grace: Duration) {
    cancel.cancelled().await;
    tokio::time::sleep(grace).await;
}

async fn run_one(ctx: &RunContext, target: &Target, root: &Path, dry_run: bool) -> TargetStatus {
    info!("Starting {}", target.name);
    let workspace = match TargetWorkspace::create(root, &target.name) {
        Ok(workspace) => workspace,
        Err(e) => {
            return TargetStatus::Failed(TargetFailure::new(
                &target.name,
                ctx.redactor.redact(&e.to_string()),
            ))
        }
    };

    match pipeline::run_target(ctx, target, workspace.path(), dry_run).await {
        Ok(()) => TargetStatus::Succeeded,
        Err(failure) => TargetStatus::Failed(failure),
    }
}
