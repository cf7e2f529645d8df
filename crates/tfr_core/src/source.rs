//! Fetching target repositories.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use tfr_runner::CommandRunner;

use crate::error::{CoreError, CoreResult};
use crate::git::{GitCredentials, GitOps};
use crate::model::Target;

/// Produces a checkout of a target's source at its revision.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Check out `target` into `<workspace>/<name>` and return that path.
    async fn fetch(&self, target: &Target, workspace: &Path) -> CoreResult<PathBuf>;
}

/// Fetches sources with the git CLI using basic auth.
pub struct GitFetcher {
    runner: Arc<dyn CommandRunner>,
    credentials: GitCredentials,
    ca_bundle: Option<PathBuf>,
}

impl GitFetcher {
    pub fn new(runner: Arc<dyn CommandRunner>, credentials: GitCredentials) -> Self {
        Self {
            runner,
            credentials,
            ca_bundle: None,
        }
    }

    pub fn with_ca_bundle(mut self, path: Option<PathBuf>) -> Self {
        self.ca_bundle = path;
        self
    }

    fn clone_error(&self, target: &Target, message: impl Into<String>) -> CoreError {
        CoreError::Clone {
            target: target.name.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, target: &Target, workspace: &Path) -> CoreResult<PathBuf> {
        let checkout = workspace.join(&target.name);
        fs::create_dir(&checkout).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                self.clone_error(target, format!("{} already exists", checkout.display()))
            }
            _ => self.clone_error(target, e.to_string()),
        })?;

        info!("Cloning {} at {}", target.name, target.revision);

        let git = GitOps::new(self.runner.clone(), &checkout)
            .with_ca_bundle(self.ca_bundle.as_deref())
            .credentials(&self.credentials);

        let url = self.credentials.authenticate_url(&target.url);
        git.clone_remote(&url)
            .await
            .map_err(|e| self.clone_error(target, e.to_string()))?;
        git.checkout(&target.revision)
            .await
            .map_err(|e| self.clone_error(target, e.to_string()))?;

        Ok(checkout)
    }
}
