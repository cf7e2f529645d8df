//! # tfr_iac
//!
//! Terraform provisioning driver for tf-repo-executor.
//!
//! Each target picks its own terraform version; binaries live under
//! `<root>/<version>/terraform`. The driver runs one target through
//! `init` and then `plan` (dry run), `destroy` or `apply`, followed by the
//! optional FIPS compliance check, output capture and state archival.
//!
//! ## Features
//!
//! - Versioned binary selection
//! - Streamed command output with a periodic heartbeat
//! - Quiet capture for `output` and `show`, which may print secrets
//! - FIPS endpoint check on the saved plan
//! - Best-effort state archival through the [`StateSink`] trait
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tfr_iac::{ProvisionRequest, ProvisioningDriver, TerraformBinaries};
//! use tfr_runner::ProcessRunner;
//!
//! # async fn run() -> tfr_iac::IacResult<()> {
//! let driver = ProvisioningDriver::new(Arc::new(ProcessRunner::new()), TerraformBinaries::default());
//!
//! let request = ProvisionRequest::new("network", "/tmp/tf-repo/network/network/prod", "1.5.7")
//!     .dry_run(true)
//!     .require_fips(true);
//!
//! driver.drive(&request, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod compliance;
pub mod driver;
pub mod error;
pub mod sink;
pub mod terraform;

pub use compliance::{ensure_fips, uses_fips_endpoint};
pub use driver::{ProvisionOutcome, ProvisionRequest, ProvisioningDriver, Stage, HEARTBEAT_INTERVAL};
pub use error::{IacError, IacResult};
pub use sink::{StateSink, StateSnapshot};
pub use terraform::{OutputMeta, TerraformBinaries, TerraformRunner, DEFAULT_BINARY_ROOT};
