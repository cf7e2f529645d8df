//! Discovery of KV engine versions per mount.

use std::collections::BTreeMap;

use crate::error::{VaultError, VaultResult};
use crate::secret::{KvSchema, SecretRef};

/// KV engine version of every mounted secret engine, keyed by mount name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    mounts: BTreeMap<String, KvSchema>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mount; trailing slashes are ignored.
    pub fn with_mount(mut self, mount: impl AsRef<str>, schema: KvSchema) -> Self {
        self.insert(mount.as_ref(), schema);
        self
    }

    fn insert(&mut self, mount: &str, schema: KvSchema) {
        self.mounts
            .insert(mount.trim_end_matches('/').to_string(), schema);
    }

    /// Build the table from `(mount, engine type, options.version)` entries
    /// as listed by `sys/mounts`. Non-KV engines are skipped.
    pub fn from_engines<I>(engines: I) -> Self
    where
        I: IntoIterator<Item = (String, String, Option<String>)>,
    {
        let mut table = Self::new();
        for (mount, engine, version) in engines {
            if !matches!(engine.as_str(), "kv" | "generic") {
                continue;
            }
            let schema = match version.as_deref() {
                Some("2") => KvSchema::V2,
                _ => KvSchema::V1,
            };
            table.insert(&mount, schema);
        }
        table
    }

    /// KV schema of the mount a secret path lives under.
    pub fn schema_for(&self, path: &str) -> VaultResult<KvSchema> {
        let secret = SecretRef::new(path);
        let mount = secret.mount()?;
        self.mounts
            .get(mount)
            .copied()
            .ok_or_else(|| VaultError::UnknownMount(path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

/// How the KV schema of a secret path is determined.
#[derive(Debug, Clone)]
pub enum SchemaResolver {
    /// Every mount uses the same, explicitly configured schema.
    Fixed(KvSchema),
    /// Schema looked up in the mount table fetched at startup.
    Discovered(MountTable),
}

impl SchemaResolver {
    pub fn resolve(&self, path: &str) -> VaultResult<KvSchema> {
        match self {
            Self::Fixed(schema) => Ok(*schema),
            Self::Discovered(table) => table.schema_for(path),
        }
    }
}
