//! Error types for the core module.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while reconciling targets.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid target {target:?}: {message}")]
    InvalidTarget { target: String, message: String },

    #[error("Unable to prepare working directory {}: {source}", .path.display())]
    Workdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not clone repository for {target}: {message}")]
    Clone { target: String, message: String },

    #[error("Git error: {0}")]
    GitError(String),

    #[error("errors encountered within {failed}/{total} targets")]
    TargetsFailed { failed: usize, total: usize },

    #[error("Vault error: {0}")]
    Vault(#[from] tfr_vault::VaultError),

    #[error("Template error: {0}")]
    Template(#[from] tfr_templates::TemplateError),

    #[error("{0}")]
    Iac(#[from] tfr_iac::IacError),

    #[error("Runner error: {0}")]
    Runner(#[from] tfr_runner::RunnerError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single target, with secret values already removed from
/// the cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{target}: {cause}")]
pub struct TargetFailure {
    pub target: String,
    pub cause: String,
}

impl TargetFailure {
    pub fn new(target: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            cause: cause.into(),
        }
    }
}
