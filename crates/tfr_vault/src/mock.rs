//! In-memory secrets store for testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{VaultError, VaultResult};
use crate::kv::KvData;
use crate::secret::{KvSchema, SecretRef};
use crate::store::SecretStore;

/// A write captured by [`MockSecretStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub path: String,
    pub schema: KvSchema,
    pub data: KvData,
}

/// Secrets store backed by a map, keyed by secret path.
///
/// Versions are ignored; every read returns the stored data.
#[derive(Debug, Clone, Default)]
pub struct MockSecretStore {
    secrets: Arc<RwLock<BTreeMap<String, KvData>>>,
    writes: Arc<RwLock<Vec<RecordedWrite>>>,
    reads: Arc<RwLock<Vec<String>>>,
}

impl MockSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret at `path`.
    pub fn with_secret(self, path: impl Into<String>, data: KvData) -> Self {
        self.secrets.write().insert(path.into(), data);
        self
    }

    /// All writes in the order they happened.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().clone()
    }

    /// Paths read, in order.
    pub fn reads(&self) -> Vec<String> {
        self.reads.read().clone()
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn read(&self, secret: &SecretRef, schema: KvSchema) -> VaultResult<KvData> {
        secret.api_path(schema)?;
        self.reads.write().push(secret.path.clone());

        match self.secrets.read().get(&secret.path) {
            Some(data) if data.is_empty() => Err(VaultError::Schema {
                path: secret.path.clone(),
                message: "no key-values stored within secret".to_string(),
            }),
            Some(data) => Ok(data.clone()),
            None => Err(VaultError::NotFound(secret.path.clone())),
        }
    }

    async fn write(&self, secret: &SecretRef, data: &KvData, schema: KvSchema) -> VaultResult<()> {
        secret.api_path(schema)?;
        self.secrets.write().insert(secret.path.clone(), data.clone());
        self.writes.write().push(RecordedWrite {
            path: secret.path.clone(),
            schema,
            data: data.clone(),
        });
        Ok(())
    }
}
