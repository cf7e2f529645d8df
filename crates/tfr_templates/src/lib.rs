//! # tfr_templates
//!
//! Configuration materialization for tf-repo-executor.
//!
//! Before terraform runs in a checkout, three files are generated next to
//! the root module:
//!
//! - `s3.tfbackend`: partial S3 backend config with credentials and state key
//! - `aws.auto.tfvars`: AWS and Vault provider credentials
//! - `input.auto.tfvars`: input variables read from Vault
//!
//! All values are quoted and escaped so the generated HCL stays valid
//! whatever the secret contains.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfr_templates::{extract_credentials, BackendOverride, Materializer, VaultAccess};
//! use tfr_vault::KvData;
//! use std::path::Path;
//!
//! # fn run(secret: KvData) -> tfr_templates::TemplateResult<()> {
//! let creds = extract_credentials(&secret, "network", &BackendOverride::new().prefix("state"))?;
//! let materializer = Materializer::new()?;
//! let dir = Path::new("/tmp/tf-repo/network/terraform");
//!
//! materializer.render_backend(&creds, dir)?;
//! materializer.render_credential_vars(&creds, &VaultAccess::new("https://vault", "role", "secret"), dir)?;
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod error;
pub mod materializer;
pub mod renderer;

pub use credentials::{extract_credentials, state_key, BackendOverride, CredentialRecord};
pub use error::{TemplateError, TemplateResult};
pub use materializer::{
    Materializer, VaultAccess, AWS_VARS_FILE, BACKEND_FILE, INPUT_VARS_FILE,
};
pub use renderer::{escape_hcl, TemplateRenderer};
