//! Secret references and KV engine path conventions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Which KV secret engine version a mount uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvSchema {
    /// Flat layout: the API path is the secret path.
    V1,
    /// Versioned layout: `<mount>/data/<rest>` with a `data` envelope.
    V2,
}

impl fmt::Display for KvSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for KvSchema {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "v1" | "kv_v1" => Ok(Self::V1),
            "2" | "v2" | "kv_v2" => Ok(Self::V2),
            other => Err(VaultError::InvalidSchema(other.to_string())),
        }
    }
}

/// Location of a secret in Vault.
///
/// A missing or zero `version` means "latest".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl SecretRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Whether a path was configured at all.
    pub fn is_set(&self) -> bool {
        !self.path.trim().is_empty()
    }

    /// The explicit version to request, if any.
    pub fn pinned_version(&self) -> Option<u64> {
        self.version.filter(|v| *v != 0)
    }

    /// Split the path into mount and remaining secret path.
    pub fn split(&self) -> VaultResult<(&str, &str)> {
        match self.path.trim_matches('/').split_once('/') {
            Some((mount, rest)) if !mount.is_empty() && !rest.is_empty() => Ok((mount, rest)),
            _ => Err(VaultError::InvalidPath(self.path.clone())),
        }
    }

    /// Mount name (first path segment).
    pub fn mount(&self) -> VaultResult<&str> {
        self.split().map(|(mount, _)| mount)
    }

    /// Path used against the HTTP API for the given schema.
    pub fn api_path(&self, schema: KvSchema) -> VaultResult<String> {
        let (mount, rest) = self.split()?;
        Ok(match schema {
            KvSchema::V1 => format!("{}/{}", mount, rest),
            KvSchema::V2 => format!("{}/data/{}", mount, rest),
        })
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pinned_version() {
            Some(v) => write!(f, "{} (version {})", self.path, v),
            None => write!(f, "{} (latest)", self.path),
        }
    }
}
