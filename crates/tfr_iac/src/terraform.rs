//! Terraform runner for versioned local binaries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use tfr_runner::{CommandConfig, CommandRunner, ExecutionResult, RunConfig};

use crate::error::{IacError, IacResult};

/// Default directory holding one subdirectory per terraform version.
pub const DEFAULT_BINARY_ROOT: &str = "/usr/bin/Terraform";

/// Locates the terraform binary for a version selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerraformBinaries {
    root: PathBuf,
}

impl Default for TerraformBinaries {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY_ROOT)
    }
}

impl TerraformBinaries {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `<root>/<version>/terraform`.
    pub fn binary(&self, version: &str) -> IacResult<PathBuf> {
        let valid = !version.is_empty()
            && version != "."
            && version != ".."
            && !version.contains(['/', '\\']);
        if !valid {
            return Err(IacError::InvalidVersion(version.to_string()));
        }
        Ok(self.root.join(version).join("terraform"))
    }
}

/// One entry of `terraform output -json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputMeta {
    #[serde(default)]
    pub sensitive: bool,
    #[serde(rename = "type", default)]
    pub output_type: Value,
    pub value: Value,
}

/// Terraform runner bound to one binary and one module directory.
pub struct TerraformRunner {
    runner: Arc<dyn CommandRunner>,
    binary: PathBuf,
    workdir: PathBuf,
    label: String,
    heartbeat: Option<Duration>,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        binary: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            workdir: workdir.into(),
            label: "terraform".to_string(),
            heartbeat: None,
        }
    }

    /// Prefix for streamed log lines, usually the target name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Log a progress line at this interval during long-running steps.
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = Some(interval);
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run terraform init with the generated backend config.
    pub async fn init(&self, backend_file: &str) -> IacResult<ExecutionResult> {
        info!("Initializing terraform config for {}", self.label);
        let backend = format!("-backend-config={}", backend_file);
        let result = self
            .run_command(&["init", "-input=false", "-no-color", &backend], self.streaming())
            .await?;
        check(result, IacError::InitFailed)
    }

    /// Run terraform plan, writing the plan to `plan_file`.
    pub async fn plan(&self, plan_file: &Path, destroy: bool) -> IacResult<ExecutionResult> {
        info!("Performing terraform plan for {}", self.label);
        let out = format!("-out={}", plan_file.display());
        let mut args = vec!["plan", "-input=false", "-no-color", out.as_str()];
        if destroy {
            args.push("-destroy");
        }
        let result = self.run_command(&args, self.streaming()).await?;
        check(result, IacError::PlanFailed)
    }

    /// Run terraform apply.
    pub async fn apply(&self) -> IacResult<ExecutionResult> {
        info!("Performing terraform apply for {}", self.label);
        let result = self
            .run_command(
                &["apply", "-input=false", "-no-color", "-auto-approve"],
                self.streaming(),
            )
            .await?;
        check(result, IacError::ApplyFailed)
    }

    /// Run terraform destroy.
    pub async fn destroy(&self) -> IacResult<ExecutionResult> {
        info!("Performing terraform destroy for {}", self.label);
        let result = self
            .run_command(
                &["destroy", "-input=false", "-no-color", "-auto-approve"],
                self.streaming(),
            )
            .await?;
        check(result, IacError::DestroyFailed)
    }

    /// Read root module outputs.
    ///
    /// Output values may be sensitive, so neither stdout nor stderr is ever
    /// logged or surfaced.
    pub async fn output(&self) -> IacResult<BTreeMap<String, OutputMeta>> {
        let result = self
            .run_command(&["output", "-json"], RunConfig::quiet())
            .await?;
        if !result.success() {
            return Err(IacError::OutputFailed(format!(
                "exit code {}",
                result.exit_code
            )));
        }
        serde_json::from_str(&result.stdout)
            .map_err(|e| IacError::OutputFailed(format!("unreadable output JSON: {}", e)))
    }

    /// JSON representation of a saved plan.
    pub async fn show_plan(&self, plan_file: &Path) -> IacResult<Value> {
        let plan = plan_file.display().to_string();
        let result = self
            .run_command(&["show", "-json", &plan], RunConfig::quiet())
            .await?;
        let result = check(result, IacError::ShowFailed)?;
        Ok(serde_json::from_str(&result.stdout)?)
    }

    /// Human-readable current state.
    pub async fn show_state(&self) -> IacResult<String> {
        let result = self
            .run_command(&["show", "-no-color"], RunConfig::quiet())
            .await?;
        Ok(check(result, IacError::ShowFailed)?.stdout)
    }

    fn streaming(&self) -> RunConfig {
        let config = RunConfig::default().stream_logs(true);
        match self.heartbeat {
            Some(interval) => config.heartbeat(interval),
            None => config,
        }
    }

    /// Run arbitrary terraform command.
    async fn run_command(&self, args: &[&str], run_config: RunConfig) -> IacResult<ExecutionResult> {
        let config = CommandConfig::new(self.binary.display().to_string())
            .args(args.iter().copied())
            .workdir(&self.workdir)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .label(&self.label);

        debug!("Executing terraform {:?}", args);

        Ok(self.runner.run(&config, &run_config).await?)
    }
}

fn check(
    result: ExecutionResult,
    failed: impl FnOnce(String) -> IacError,
) -> IacResult<ExecutionResult> {
    if result.success() {
        return Ok(result);
    }
    let stderr = result.stderr.trim();
    let message = if stderr.is_empty() {
        format!("exit code {}", result.exit_code)
    } else {
        stderr.to_string()
    };
    Err(failed(message))
}
