//! Shared, read-only state of a run.

use std::sync::Arc;

use tfr_iac::{ProvisioningDriver, StateSink};
use tfr_templates::{Materializer, VaultAccess};
use tfr_vault::{SchemaResolver, SecretStore};

use crate::error::CoreResult;
use crate::git::GitCredentials;
use crate::redact::Redactor;
use crate::source::SourceFetcher;

/// Everything a target pipeline needs besides the target itself.
///
/// Built once per run and shared between target tasks behind an `Arc`.
pub struct RunContext {
    pub secrets: Arc<dyn SecretStore>,
    pub schemas: SchemaResolver,
    /// Vault login handed to terraform's vault provider.
    pub vault: VaultAccess,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub driver: ProvisioningDriver,
    pub state_sink: Option<Arc<dyn StateSink>>,
    pub materializer: Materializer,
    /// Run-level secrets removed from every target failure.
    pub redactor: Redactor,
}

impl RunContext {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        schemas: SchemaResolver,
        vault: VaultAccess,
        fetcher: Arc<dyn SourceFetcher>,
        driver: ProvisioningDriver,
    ) -> CoreResult<Self> {
        let redactor = Redactor::new()
            .with(vault.role_id.clone())
            .with(vault.secret_id.clone());
        Ok(Self {
            secrets,
            schemas,
            vault,
            fetcher,
            driver,
            state_sink: None,
            materializer: Materializer::new()?,
            redactor,
        })
    }

    /// Archive state snapshots after apply and destroy.
    pub fn with_state_sink(mut self, sink: Arc<dyn StateSink>) -> Self {
        self.state_sink = Some(sink);
        self
    }

    /// Also redact `secret` from target failures.
    pub fn with_redacted(mut self, secret: impl Into<String>) -> Self {
        self.redactor.add(secret);
        self
    }

    /// Redact the git token, both raw and URL-encoded.
    pub fn with_git_credentials(mut self, credentials: &GitCredentials) -> Self {
        self.redactor.extend(credentials.secret_values());
        self
    }
}
