//! State snapshots committed to the audit repository.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use tracing::info;

use tfr_iac::{StateSink, StateSnapshot};
use tfr_runner::CommandRunner;
use tfr_templates::TemplateRenderer;

use crate::error::CoreResult;
use crate::git::{GitAuthor, GitCredentials, GitOps};

/// Replacement for `vault_*` data source blocks.
pub const VAULT_BLOCK_MASK: &str = "[REDACTED VAULT SECRET]";

const STATE_TEMPLATE: &str = "# {{name}}

* Repository: {{url}}
* Ref: `{{revision}}`

```
{{state}}
```
";

/// Masks top-level `data "vault_..." { ... }` blocks of `terraform show`
/// output.
#[derive(Debug, Clone)]
pub struct StateMasker {
    vault_block: Regex,
}

impl StateMasker {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            vault_block: Regex::new(r#"(?msU)^data "vault_.+\n\}"#)?,
        })
    }

    pub fn mask(&self, state: &str) -> String {
        self.vault_block
            .replace_all(state, VAULT_BLOCK_MASK)
            .into_owned()
    }
}

/// Commits one markdown file per target to the audit repository.
pub struct AuditArchiver {
    runner: Arc<dyn CommandRunner>,
    repo_url: String,
    credentials: GitCredentials,
    author: GitAuthor,
    ca_bundle: Option<PathBuf>,
    masker: StateMasker,
    renderer: TemplateRenderer,
}

impl AuditArchiver {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        repo_url: impl Into<String>,
        credentials: GitCredentials,
        email: impl Into<String>,
    ) -> CoreResult<Self> {
        let author = GitAuthor::new(credentials.username.clone(), email);
        Ok(Self {
            runner,
            repo_url: repo_url.into(),
            credentials,
            author,
            ca_bundle: None,
            masker: StateMasker::new()?,
            renderer: TemplateRenderer::new()?,
        })
    }

    pub fn with_ca_bundle(mut self, path: Option<PathBuf>) -> Self {
        self.ca_bundle = path;
        self
    }

    /// Markdown document for a snapshot, with vault data sources masked.
    pub fn render(&self, snapshot: &StateSnapshot) -> String {
        let vars: HashMap<String, String> = [
            ("name", snapshot.target.clone()),
            ("url", snapshot.source_url.clone()),
            ("revision", snapshot.revision.clone()),
            ("state", self.masker.mask(snapshot.state.trim_end())),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        self.renderer.render_content(STATE_TEMPLATE, &vars)
    }
}

#[async_trait]
impl StateSink for AuditArchiver {
    async fn archive(&self, snapshot: &StateSnapshot) -> anyhow::Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("tf-repo-state")
            .tempdir()
            .context("could not create scratch directory")?;

        let git = GitOps::new(self.runner.clone(), scratch.path())
            .with_ca_bundle(self.ca_bundle.as_deref())
            .credentials(&self.credentials);

        git.clone_remote(&self.credentials.authenticate_url(&self.repo_url))
            .await
            .context("could not clone audit repository")?;

        let file = format!("{}.md", snapshot.target);
        fs::write(scratch.path().join(&file), self.render(snapshot))
            .context("could not write state markdown")?;

        git.add(&[file.as_str()]).await?;
        if !git.has_changes().await? {
            info!("State for {} unchanged, nothing to archive", snapshot.target);
            return Ok(());
        }

        let message = format!(
            "{}: {}",
            snapshot.target,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        git.commit(&message, &self.author)
            .await
            .context("could not commit state")?;
        git.push("origin")
            .await
            .context("could not push state to audit repository")?;

        info!("Archived state for {}", snapshot.target);
        Ok(())
    }
}
