//! Secrets store trait.

use async_trait::async_trait;

use crate::error::VaultResult;
use crate::kv::KvData;
use crate::secret::{KvSchema, SecretRef};

/// Read/write access to versioned key/value secrets.
///
/// Implemented by [`crate::VaultClient`] and [`crate::MockSecretStore`].
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the key/value pairs of a secret.
    async fn read(&self, secret: &SecretRef, schema: KvSchema) -> VaultResult<KvData>;

    /// Replace the key/value pairs of a secret.
    async fn write(&self, secret: &SecretRef, data: &KvData, schema: KvSchema) -> VaultResult<()>;
}
