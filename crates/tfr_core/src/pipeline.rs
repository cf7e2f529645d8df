//! The per-target reconciliation steps.

use std::path::Path;

use tracing::info;

use tfr_iac::ProvisionRequest;
use tfr_templates::extract_credentials;
use tfr_vault::{KvData, KvValue, SecretRef};

use crate::context::RunContext;
use crate::error::{CoreResult, TargetFailure};
use crate::model::Target;
use crate::redact::Redactor;

/// Reconcile one target inside its private workspace.
///
/// Any error is returned with run-level and target credentials redacted.
pub async fn run_target(
    ctx: &RunContext,
    target: &Target,
    workspace: &Path,
    dry_run: bool,
) -> Result<(), TargetFailure> {
    let mut redactor = ctx.redactor.clone();
    steps(ctx, target, workspace, dry_run, &mut redactor)
        .await
        .map_err(|e| TargetFailure::new(&target.name, redactor.redact(&e.to_string())))
}

async fn read_secret(ctx: &RunContext, secret: &SecretRef) -> CoreResult<KvData> {
    let schema = ctx.schemas.resolve(&secret.path)?;
    Ok(ctx.secrets.read(secret, schema).await?)
}

async fn steps(
    ctx: &RunContext,
    target: &Target,
    workspace: &Path,
    dry_run: bool,
    redactor: &mut Redactor,
) -> CoreResult<()> {
    let checkout = ctx.fetcher.fetch(target, workspace).await?;
    let module_dir = checkout.join(&target.path);

    let secret = read_secret(ctx, &target.aws_creds).await?;
    let creds = extract_credentials(&secret, &target.name, &target.backend_override())?;
    redactor.extend(creds.secret_values());

    ctx.materializer.render_backend(&creds, &module_dir)?;
    ctx.materializer
        .render_credential_vars(&creds, &ctx.vault, &module_dir)?;

    if let Some(inputs) = target.input_secret() {
        let data = read_secret(ctx, inputs).await?;
        redactor.extend(data.values().filter_map(KvValue::as_str));
        ctx.materializer.render_input_vars(&data, &module_dir)?;
    }

    let request = ProvisionRequest::new(&target.name, &module_dir, &target.tf_version)
        .plan_file(workspace.join(format!("{}-plan", target.name)))
        .source(&target.url, &target.revision)
        .dry_run(dry_run)
        .delete(target.delete)
        .require_fips(target.require_fips)
        .capture_outputs(target.output_secret().is_some());

    let outcome = ctx.driver.drive(&request, ctx.state_sink.as_deref()).await?;

    if let (Some(outputs), Some(secret)) = (outcome.outputs, target.output_secret()) {
        let data: KvData = outputs
            .into_iter()
            .map(|(key, meta)| (key, KvValue::from_json_lossy(meta.value)))
            .collect();
        let schema = ctx.schemas.resolve(&secret.path)?;
        info!(
            "Writing {} output values for {} to {} in Vault",
            data.len(),
            target.name,
            secret.path
        );
        ctx.secrets.write(secret, &data, schema).await?;
    }

    Ok(())
}
