//! AWS credential extraction from a Vault secret.

use std::fmt;

use tfr_vault::KvData;

use crate::error::{TemplateError, TemplateResult};

pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const AWS_REGION: &str = "region";
pub const AWS_BUCKET: &str = "bucket";

/// Suffix of every state object key.
pub const STATE_KEY_SUFFIX: &str = "-tf-repo.tfstate";

/// Target-level backend settings that take precedence over the secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOverride {
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Object key prefix for the state file.
    pub prefix: Option<String>,
}

impl BackendOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Credentials and backend location for one target run.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    /// State object key inside the bucket.
    pub key: String,
}

impl CredentialRecord {
    /// Values that must never appear in logs or errors.
    pub fn secret_values(&self) -> [&str; 2] {
        [&self.access_key, &self.secret_key]
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .finish()
    }
}

/// Deterministic state object key for a target.
pub fn state_key(name: &str, prefix: Option<&str>) -> String {
    match prefix.map(|p| p.trim_end_matches('/')) {
        Some(p) if !p.is_empty() => format!("{}/{}{}", p, name, STATE_KEY_SUFFIX),
        _ => format!("{}{}", name, STATE_KEY_SUFFIX),
    }
}

fn required(secret: &KvData, field: &str) -> TemplateResult<String> {
    secret
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| TemplateError::CredentialExtraction {
            field: field.to_string(),
        })
}

fn explicit(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Build the credential record for target `name`.
///
/// The access and secret keys always come from the secret. Bucket and
/// region come from the override when set there, otherwise they must be
/// present in the secret too.
pub fn extract_credentials(
    secret: &KvData,
    name: &str,
    overrides: &BackendOverride,
) -> TemplateResult<CredentialRecord> {
    let access_key = required(secret, AWS_ACCESS_KEY_ID)?;
    let secret_key = required(secret, AWS_SECRET_ACCESS_KEY)?;

    let bucket = match explicit(&overrides.bucket) {
        Some(bucket) => bucket,
        None => required(secret, AWS_BUCKET)?,
    };
    let region = match explicit(&overrides.region) {
        Some(region) => region,
        None => required(secret, AWS_REGION)?,
    };

    Ok(CredentialRecord {
        access_key,
        secret_key,
        region,
        bucket,
        key: state_key(name, overrides.prefix.as_deref()),
    })
}
