//! Per-target terraform lifecycle.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use tfr_runner::CommandRunner;

use crate::compliance;
use crate::error::IacResult;
use crate::sink::{StateSink, StateSnapshot};
use crate::terraform::{OutputMeta, TerraformBinaries, TerraformRunner};

/// Interval of progress lines during init, plan, apply and destroy.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Backend config file name passed to `terraform init`.
const BACKEND_FILE: &str = "s3.tfbackend";

/// Steps of the provisioning state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Plan,
    Apply,
    Destroy,
    Output,
    ComplianceCheck,
    StateArchive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Destroy => "destroy",
            Self::Output => "output",
            Self::ComplianceCheck => "compliance check",
            Self::StateArchive => "state archive",
        };
        f.write_str(name)
    }
}

/// What to run for one target.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub name: String,
    /// Directory holding the root module and the generated files.
    pub module_dir: PathBuf,
    pub plan_file: PathBuf,
    pub tf_version: String,
    pub source_url: String,
    pub revision: String,
    pub dry_run: bool,
    pub delete: bool,
    pub require_fips: bool,
    /// Read outputs after a successful apply.
    pub capture_outputs: bool,
}

impl ProvisionRequest {
    pub fn new(
        name: impl Into<String>,
        module_dir: impl Into<PathBuf>,
        tf_version: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let module_dir = module_dir.into();
        let plan_file = module_dir.join(format!("{}-plan", name));
        Self {
            name,
            module_dir,
            plan_file,
            tf_version: tf_version.into(),
            source_url: String::new(),
            revision: String::new(),
            dry_run: false,
            delete: false,
            require_fips: false,
            capture_outputs: false,
        }
    }

    pub fn plan_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_file = path.into();
        self
    }

    pub fn source(mut self, url: impl Into<String>, revision: impl Into<String>) -> Self {
        self.source_url = url.into();
        self.revision = revision.into();
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn delete(mut self, enabled: bool) -> Self {
        self.delete = enabled;
        self
    }

    pub fn require_fips(mut self, enabled: bool) -> Self {
        self.require_fips = enabled;
        self
    }

    pub fn capture_outputs(mut self, enabled: bool) -> Self {
        self.capture_outputs = enabled;
        self
    }
}

/// Result of a successful drive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionOutcome {
    /// Root module outputs, when requested and an apply ran.
    pub outputs: Option<BTreeMap<String, OutputMeta>>,
    /// Whether a state snapshot reached the sink.
    pub archived: bool,
    /// Stages that completed, in order.
    pub stages: Vec<Stage>,
}

/// Drives terraform through init, plan/apply/destroy and the checks after.
pub struct ProvisioningDriver {
    runner: Arc<dyn CommandRunner>,
    binaries: TerraformBinaries,
    heartbeat: Duration,
}

impl ProvisioningDriver {
    pub fn new(runner: Arc<dyn CommandRunner>, binaries: TerraformBinaries) -> Self {
        Self {
            runner,
            binaries,
            heartbeat: HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = interval;
        self
    }

    /// Run the lifecycle for one target.
    ///
    /// Step failures are returned; a failed state archive is only logged.
    pub async fn drive(
        &self,
        request: &ProvisionRequest,
        sink: Option<&dyn StateSink>,
    ) -> IacResult<ProvisionOutcome> {
        let binary = self.binaries.binary(&request.tf_version)?;
        let terraform = TerraformRunner::new(self.runner.clone(), binary, &request.module_dir)
            .with_label(&request.name)
            .with_heartbeat(self.heartbeat);

        let mut outcome = ProvisionOutcome::default();

        terraform.init(BACKEND_FILE).await?;
        outcome.stages.push(Stage::Init);

        if request.dry_run {
            terraform.plan(&request.plan_file, request.delete).await?;
            outcome.stages.push(Stage::Plan);
            if request.require_fips {
                info!("Checking FIPS compliance for {}", request.name);
                let plan = terraform.show_plan(&request.plan_file).await?;
                compliance::ensure_fips(&request.name, &plan)?;
                outcome.stages.push(Stage::ComplianceCheck);
            }
            return Ok(outcome);
        }

        if request.delete {
            terraform.destroy().await?;
            outcome.stages.push(Stage::Destroy);
        } else {
            terraform.apply().await?;
            outcome.stages.push(Stage::Apply);
            if request.capture_outputs {
                info!("Capturing output values for {}", request.name);
                outcome.outputs = Some(terraform.output().await?);
                outcome.stages.push(Stage::Output);
            }
        }

        if let Some(sink) = sink {
            outcome.archived = self.archive_state(&terraform, request, sink).await;
            if outcome.archived {
                outcome.stages.push(Stage::StateArchive);
            }
        }

        Ok(outcome)
    }

    async fn archive_state(
        &self,
        terraform: &TerraformRunner,
        request: &ProvisionRequest,
        sink: &dyn StateSink,
    ) -> bool {
        let state = match terraform.show_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Unable to read state for {}: {}", request.name, e);
                return false;
            }
        };

        let snapshot = StateSnapshot {
            target: request.name.clone(),
            source_url: request.source_url.clone(),
            revision: request.revision.clone(),
            state,
        };
        match sink.archive(&snapshot).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to archive state for {}: {:#}", request.name, e);
                false
            }
        }
    }
}
