//! Run input loading and executor settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::model::RunInput;

pub const DEFAULT_WORKDIR: &str = "/tmp/tf-repo";
pub const DEFAULT_PARALLELISM: usize = 10;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Decode a run input, auto-detecting JSON or YAML, and validate it.
///
/// Text whose first non-whitespace character is `{` is read as JSON.
pub fn parse_run_input(raw: &str) -> CoreResult<RunInput> {
    let input: RunInput = if raw.trim_start().starts_with('{') {
        serde_json::from_str(raw)?
    } else {
        serde_yaml::from_str(raw)?
    };
    input.validate()?;
    Ok(input)
}

/// Read and decode the config file at `path`.
pub fn load_run_input(path: &Path) -> CoreResult<RunInput> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("unable to read {}: {}", path.display(), e)))?;
    let input = parse_run_input(&raw)?;
    info!(
        "Loaded {} targets from {} (dry run: {})",
        input.repos.len(),
        path.display(),
        input.dry_run
    );
    Ok(input)
}

/// Where targets run and how many at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub workdir: PathBuf,
    pub parallelism: usize,
    /// How long admitted targets may keep running after cancellation.
    pub shutdown_grace: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from(DEFAULT_WORKDIR),
            parallelism: DEFAULT_PARALLELISM,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ExecutorSettings {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            ..Self::default()
        }
    }

    /// Maximum concurrent targets; values below 1 are treated as 1.
    pub fn parallelism(mut self, limit: usize) -> Self {
        self.parallelism = limit.max(1);
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
