//! Process settings, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::warn;

use tfr_core::{DEFAULT_PARALLELISM, DEFAULT_WORKDIR};
use tfr_iac::DEFAULT_BINARY_ROOT;
use tfr_vault::KvSchema;

pub const DEFAULT_FLUSH_DELAY_SECONDS: u64 = 3;

/// tf-repo-executor - reconcile terraform repositories declared in a config file
#[derive(Parser, Debug)]
#[command(name = "tf-repo-executor")]
#[command(version, about = "Reconcile terraform repositories declared in a config file")]
#[command(long_about = r#"
Clones every repository listed in the config file, wires AWS credentials and
input variables from Vault into terraform, runs plan (dry run), apply or
destroy, writes outputs back to Vault and commits redacted state to an audit
repository.

Every option can be set through the environment variable shown.

EXIT CODES:
  0   - Success
  1   - One or more targets failed, or another unclassified error
  2   - Invalid configuration or environment
  3   - Vault authentication or mount discovery failed
  4   - Working directory could not be prepared
  130 - Interrupted by signal
"#)]
pub struct Settings {
    /// Run input (YAML or JSON)
    #[arg(long, env = "CONFIG_FILE", default_value = "/config.yaml")]
    pub config_file: PathBuf,

    /// Root directory for per-target workspaces
    #[arg(long, env = "WORKDIR", default_value = DEFAULT_WORKDIR)]
    pub workdir: PathBuf,

    #[arg(long, env = "VAULT_ADDR")]
    pub vault_addr: String,

    #[arg(long, env = "VAULT_ROLE_ID", hide_env_values = true)]
    pub vault_role_id: String,

    #[arg(long, env = "VAULT_SECRET_ID", hide_env_values = true)]
    pub vault_secret_id: String,

    /// Use this KV version for every mount instead of discovering it
    #[arg(long, env = "VAULT_KV_VERSION")]
    pub vault_kv_version: Option<KvSchema>,

    /// Audit repository receiving state snapshots
    #[arg(long, env = "GITLAB_LOG_REPO")]
    pub log_repo: String,

    #[arg(long, env = "GITLAB_USERNAME")]
    pub git_username: String,

    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub git_token: String,

    /// Author email of state commits
    #[arg(long, env = "GIT_EMAIL")]
    pub git_email: String,

    /// Maximum number of targets processed at once
    #[arg(long, env = "TF_PARALLELISM", default_value_t = DEFAULT_PARALLELISM)]
    pub parallelism: usize,

    /// Seconds to wait before exiting so log shippers can catch up
    #[arg(long, env = "LOG_FLUSH_DELAY_SECONDS", default_value = "3")]
    pub log_flush_delay: String,

    /// CA bundle trusted for git HTTPS remotes
    #[arg(long, env = "CA_BUNDLE_PATH")]
    pub ca_bundle: Option<PathBuf>,

    /// Directory holding `<version>/terraform` binaries
    #[arg(long, env = "TF_BINARY_ROOT", default_value = DEFAULT_BINARY_ROOT)]
    pub tf_binary_root: PathBuf,
}

impl Settings {
    /// Parsed flush delay; invalid values fall back to the default.
    pub fn flush_delay(&self) -> Duration {
        let seconds = self.log_flush_delay.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!(
                "Invalid LOG_FLUSH_DELAY_SECONDS {:?}, using {}",
                self.log_flush_delay, DEFAULT_FLUSH_DELAY_SECONDS
            );
            DEFAULT_FLUSH_DELAY_SECONDS
        });
        Duration::from_secs(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 15] = [
        "tf-repo-executor",
        "--vault-addr",
        "https://vault.example.com",
        "--vault-role-id",
        "role",
        "--vault-secret-id",
        "secret",
        "--log-repo",
        "https://gitlab.example.com/sre/tf-state.git",
        "--git-username",
        "bot",
        "--git-token",
        "glpat",
        "--git-email",
        "bot@example.com",
    ];

    fn parse(extra: &[&str]) -> Result<Settings, clap::Error> {
        Settings::try_parse_from(REQUIRED.iter().chain(extra.iter()))
    }

    #[test]
    fn test_flush_delay_fallback() {
        let settings = parse(&["--log-flush-delay", "soon"]).unwrap();
        assert_eq!(settings.flush_delay(), Duration::from_secs(3));

        let settings = parse(&["--log-flush-delay", "0"]).unwrap();
        assert_eq!(settings.flush_delay(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_parallelism_is_rejected() {
        assert!(parse(&["--parallelism", "many"]).is_err());
        assert_eq!(parse(&["--parallelism", "4"]).unwrap().parallelism, 4);
    }

    #[test]
    fn test_kv_version_override() {
        let settings = parse(&["--vault-kv-version", "v1"]).unwrap();
        assert_eq!(settings.vault_kv_version, Some(KvSchema::V1));
        assert!(parse(&["--vault-kv-version", "v3"]).is_err());
    }
}
