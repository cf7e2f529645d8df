//! # tfr_vault
//!
//! Secrets store client for tf-repo-executor.
//!
//! Talks to the Vault HTTP API: AppRole login, KV v1/v2 reads and writes,
//! and discovery of which KV engine version each mount uses.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfr_vault::{KvSchema, SecretRef, SecretStore, VaultClient};
//!
//! # async fn demo() -> tfr_vault::VaultResult<()> {
//! let client = VaultClient::authenticate("https://vault.example.com", "role", "secret").await?;
//! let mounts = client.mounts().await?;
//!
//! let secret = SecretRef::new("terraform/creds/prod-account").with_version(4);
//! let schema = mounts.schema_for(&secret.path)?;
//! let data = client.read(&secret, schema).await?;
//! # let _ = (data, KvSchema::V2);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod kv;
pub mod mock;
pub mod mounts;
pub mod secret;
pub mod store;

pub use client::VaultClient;
pub use error::{VaultError, VaultResult};
pub use kv::{KvData, KvValue};
pub use mock::{MockSecretStore, RecordedWrite};
pub use mounts::{MountTable, SchemaResolver};
pub use secret::{KvSchema, SecretRef};
pub use store::SecretStore;
