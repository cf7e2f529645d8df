//! Wiring of a single run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use tfr_core::{
    load_run_input, AuditArchiver, CoreError, Executor, ExecutorSettings, GitCredentials,
    GitFetcher, RunContext,
};
use tfr_iac::{ProvisioningDriver, TerraformBinaries};
use tfr_runner::{CommandRunner, ProcessRunner};
use tfr_templates::VaultAccess;
use tfr_vault::{SchemaResolver, VaultClient, VaultError};

use crate::settings::Settings;
use crate::ExitCodes;

pub async fn execute(settings: &Settings, cancel: CancellationToken) -> Result<()> {
    let input = load_run_input(&settings.config_file)?;

    let vault = VaultClient::authenticate(
        &settings.vault_addr,
        &settings.vault_role_id,
        &settings.vault_secret_id,
    )
    .await?;

    let schemas = match settings.vault_kv_version {
        Some(schema) => {
            info!("Using KV {} for all mounts", schema);
            SchemaResolver::Fixed(schema)
        }
        None => {
            let mounts = vault
                .mounts()
                .await
                .context("Failed to discover Vault KV mounts")?;
            info!("Discovered {} KV mounts", mounts.len());
            SchemaResolver::Discovered(mounts)
        }
    };

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let credentials = GitCredentials::new(&settings.git_username, &settings.git_token);

    let fetcher = GitFetcher::new(runner.clone(), credentials.clone())
        .with_ca_bundle(settings.ca_bundle.clone());
    let archiver = AuditArchiver::new(
        runner.clone(),
        &settings.log_repo,
        credentials.clone(),
        &settings.git_email,
    )?
    .with_ca_bundle(settings.ca_bundle.clone());
    let driver = ProvisioningDriver::new(runner, TerraformBinaries::new(&settings.tf_binary_root));
    let access = VaultAccess::new(
        vault.address(),
        &settings.vault_role_id,
        &settings.vault_secret_id,
    );

    let ctx = RunContext::new(Arc::new(vault), schemas, access, Arc::new(fetcher), driver)?
        .with_state_sink(Arc::new(archiver))
        .with_git_credentials(&credentials);

    let executor = Executor::new(
        Arc::new(ctx),
        ExecutorSettings::new(&settings.workdir)
            .parallelism(settings.parallelism)
            .shutdown_grace(settings.flush_delay()),
    );
    executor.run(input, cancel).await?.into_result()?;
    Ok(())
}

/// Drive `work` to completion, or give up `grace` after `cancel` fires.
///
/// Giving up drops `work`, so whatever it spawned through the process
/// runner is killed.
pub async fn until_shutdown<F: Future>(
    work: F,
    cancel: &CancellationToken,
    grace: Duration,
) -> Option<F::Output> {
    tokio::select! {
        output = work => Some(output),
        _ = async {
            cancel.cancelled().await;
            tokio::time::sleep(grace).await;
        } => None,
    }
}

/// Map a fatal error to the process exit code.
pub fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(core) = e.downcast_ref::<CoreError>() {
        return match core {
            CoreError::TargetsFailed { .. } => ExitCodes::FAILURE,
            CoreError::Workdir { .. } => ExitCodes::WORKDIR_ERROR,
            CoreError::Vault(_) => ExitCodes::VAULT_ERROR,
            CoreError::Config(_)
            | CoreError::InvalidTarget { .. }
            | CoreError::Yaml(_)
            | CoreError::Json(_) => ExitCodes::INVALID_CONFIG,
            _ => ExitCodes::FAILURE,
        };
    }
    if e.downcast_ref::<VaultError>().is_some() {
        return ExitCodes::VAULT_ERROR;
    }
    ExitCodes::FAILURE
}
