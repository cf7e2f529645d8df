//! # tfr_runner
//!
//! Process execution wrapper for tf-repo-executor.
//!
//! Every external binary the executor drives (`git`, `terraform`) goes
//! through the [`CommandRunner`] trait so that the pipeline can be exercised
//! against [`MockRunner`] in tests.
//!
//! # Features
//!
//! - **Async execution**: `tokio::process` with captured stdout/stderr
//! - **Log streaming**: child output forwarded line by line to `tracing`
//! - **Quiet mode**: capture output without ever logging it
//! - **Heartbeat**: periodic progress line while a long step runs
//! - **Masking**: sensitive arguments never appear in logged command lines
//! - **Mock Runner**: for testing without spawning processes
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tfr_runner::{CommandConfig, CommandRunner, ProcessRunner, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessRunner::new();
//!
//!     let config = CommandConfig::new("terraform")
//!         .args(["init", "-input=false"])
//!         .workdir("/tmp/tf-repo/foo/foo/prod");
//!
//!     let run = RunConfig::default()
//!         .stream_logs(true)
//!         .heartbeat(Duration::from_secs(60));
//!
//!     let result = runner.run(&config, &run).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{CommandConfig, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use heartbeat::Heartbeat;
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use process::{LogStream, ProcessRunner};
pub use runner::{CommandRunner, ExecutionResult};
