//! Git operations over the command runner.
//!
//! Used for cloning target repositories and for committing state snapshots
//! to the audit repository.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info};

use tfr_runner::config::MASK;
use tfr_runner::{CommandConfig, CommandRunner, RunConfig};

use crate::error::{CoreError, CoreResult};

/// Basic-auth credentials for HTTP(S) remotes.
#[derive(Clone)]
pub struct GitCredentials {
    pub username: String,
    pub token: String,
}

impl GitCredentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Insert the credentials into an HTTP(S) URL.
    ///
    /// Other URLs, including local paths, are returned unchanged.
    pub fn authenticate_url(&self, url: &str) -> String {
        let mut parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            _ => return url.to_string(),
        };
        if parsed.set_username(&self.username).is_err()
            || parsed.set_password(Some(&self.token)).is_err()
        {
            return url.to_string();
        }
        parsed.to_string()
    }

    /// The token as given and as percent-encoded inside an authenticated URL.
    pub fn secret_values(&self) -> Vec<String> {
        let mut values = vec![self.token.clone()];
        if let Ok(mut url) = Url::parse("https://git.invalid/") {
            if url.set_password(Some(&self.token)).is_ok() {
                if let Some(encoded) = url.password() {
                    if encoded != self.token {
                        values.push(encoded.to_string());
                    }
                }
            }
        }
        values.retain(|v| !v.is_empty());
        values
    }
}

impl fmt::Debug for GitCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitCredentials")
            .field("username", &self.username)
            .field("token", &MASK)
            .finish()
    }
}

/// Commit author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitAuthor {
    pub name: String,
    pub email: String,
}

impl GitAuthor {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Git operations manager for one working tree.
pub struct GitOps {
    runner: Arc<dyn CommandRunner>,
    repo_path: PathBuf,
    options: Vec<String>,
    sensitive: Vec<String>,
}

impl GitOps {
    /// Create a new Git operations manager for a repository.
    pub fn new(runner: Arc<dyn CommandRunner>, repo_path: impl AsRef<Path>) -> Self {
        Self {
            runner,
            repo_path: repo_path.as_ref().to_path_buf(),
            options: Vec::new(),
            sensitive: Vec::new(),
        }
    }

    /// Trust the CA bundle at `path` for HTTPS remotes.
    pub fn with_ca_bundle(mut self, path: Option<&Path>) -> Self {
        if let Some(path) = path {
            self.options.push("-c".to_string());
            self.options
                .push(format!("http.sslCAInfo={}", path.display()));
        }
        self
    }

    /// Mask `value` in logged command lines and error messages.
    pub fn sensitive(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.sensitive.push(value);
        }
        self
    }

    /// Mask every form of the credentials' token.
    pub fn credentials(self, credentials: &GitCredentials) -> Self {
        credentials
            .secret_values()
            .into_iter()
            .fold(self, |git, value| git.sensitive(value))
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Check if Git is available on the system.
    pub async fn is_git_available(runner: &dyn CommandRunner) -> bool {
        let config = CommandConfig::new("git").arg("--version");
        runner
            .run(&config, &RunConfig::quiet())
            .await
            .map(|result| result.success())
            .unwrap_or(false)
    }

    fn scrub(&self, text: &str) -> String {
        self.sensitive
            .iter()
            .fold(text.trim().to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }

    async fn git(&self, args: &[&str], action: &str) -> CoreResult<String> {
        let mut config = CommandConfig::new("git")
            .args(self.options.iter().cloned())
            .args(args.iter().copied())
            .workdir(&self.repo_path)
            .env("GIT_TERMINAL_PROMPT", "0");
        for secret in &self.sensitive {
            config = config.sensitive(secret.clone());
        }

        debug!("Running {}", config.display());

        let result = self
            .runner
            .run(&config, &RunConfig::quiet())
            .await
            .map_err(|e| {
                CoreError::GitError(format!(
                    "Failed to run git {}: {}",
                    action,
                    self.scrub(&e.to_string())
                ))
            })?;

        if !result.success() {
            return Err(CoreError::GitError(format!(
                "git {} failed: {}",
                action,
                self.scrub(&result.stderr)
            )));
        }
        Ok(result.stdout)
    }

    /// Clone `url` into the (existing, empty) repository directory.
    pub async fn clone_remote(&self, url: &str) -> CoreResult<()> {
        info!("Cloning into {}", self.repo_path.display());
        self.git(&["clone", "--quiet", url, "."], "clone").await?;
        Ok(())
    }

    /// Check out a commit hash or symbolic ref.
    pub async fn checkout(&self, revision: &str) -> CoreResult<()> {
        debug!("Checking out {}", revision);
        self.git(
            &["-c", "advice.detachedHead=false", "checkout", "--quiet", revision],
            "checkout",
        )
        .await?;
        Ok(())
    }

    /// Stage files.
    pub async fn add(&self, paths: &[&str]) -> CoreResult<()> {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.git(&args, "add").await?;
        Ok(())
    }

    /// Whether the working tree or index differs from HEAD.
    pub async fn has_changes(&self) -> CoreResult<bool> {
        let status = self.git(&["status", "--porcelain"], "status").await?;
        Ok(!status.trim().is_empty())
    }

    /// Commit staged changes.
    pub async fn commit(&self, message: &str, author: &GitAuthor) -> CoreResult<()> {
        let name = format!("user.name={}", author.name);
        let email = format!("user.email={}", author.email);
        self.git(
            &["-c", name.as_str(), "-c", email.as_str(), "commit", "--quiet", "-m", message],
            "commit",
        )
        .await?;
        Ok(())
    }

    /// Push the current branch to the same-named branch on `remote`.
    pub async fn push(&self, remote: &str) -> CoreResult<()> {
        info!("Pushing to {}", remote);
        self.git(&["push", "--quiet", remote, "HEAD"], "push").await?;
        Ok(())
    }
}
