//! # tfr_core
//!
//! Orchestration for tf-repo-executor.
//!
//! This crate loads the run input, fetches each target repository, wires
//! credentials from Vault into terraform configuration files, drives
//! terraform and commits redacted state snapshots to an audit repository.
//!
//! # Architecture
//!
//! - **Config**: Run input decoding (YAML or JSON) and executor settings
//! - **Sources**: Git checkouts of target repositories
//! - **Pipeline**: The per-target steps, from fetch to output write-back
//! - **Executor**: Bounded-parallel runs with private per-target workspaces
//! - **Archive**: Audit repository sink for state snapshots
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tfr_core::{Executor, ExecutorSettings, RunContext, load_run_input};
//!
//! let ctx = RunContext::new(secrets, schemas, vault, fetcher, driver)?
//!     .with_state_sink(Arc::new(archiver));
//! let executor = Executor::new(Arc::new(ctx), ExecutorSettings::new("/tmp/tf-repo").parallelism(4));
//!
//! let input = load_run_input("/config.yaml".as_ref())?;
//! executor.run(input, CancellationToken::new()).await?.into_result()?;
//! ```

pub mod archive;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod git;
pub mod model;
pub mod pipeline;
pub mod redact;
pub mod source;

pub use archive::{AuditArchiver, StateMasker, VAULT_BLOCK_MASK};
pub use config::{
    load_run_input, parse_run_input, ExecutorSettings, DEFAULT_PARALLELISM, DEFAULT_SHUTDOWN_GRACE,
    DEFAULT_WORKDIR,
};
pub use context::RunContext;
pub use error::{CoreError, CoreResult, TargetFailure};
pub use executor::{Executor, RunResult, TargetOutcome, TargetStatus, TargetWorkspace};
pub use git::{GitAuthor, GitCredentials, GitOps};
pub use model::{RunInput, Target, TfVariables};
pub use pipeline::run_target;
pub use redact::{Redactor, REDACTED};
pub use source::{GitFetcher, SourceFetcher};
