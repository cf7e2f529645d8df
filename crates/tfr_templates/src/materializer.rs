//! Terraform configuration files written into a checkout before init.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tfr_vault::KvData;
use tracing::debug;

use crate::credentials::CredentialRecord;
use crate::error::{TemplateError, TemplateResult};
use crate::renderer::{escape_hcl, TemplateRenderer};

/// Partial S3 backend configuration passed to `terraform init`.
pub const BACKEND_FILE: &str = "s3.tfbackend";
/// Provider credentials, loaded automatically by terraform.
pub const AWS_VARS_FILE: &str = "aws.auto.tfvars";
/// Input variables read from Vault, loaded automatically by terraform.
pub const INPUT_VARS_FILE: &str = "input.auto.tfvars";

const BACKEND_TEMPLATE: &str = r#"access_key = "{{access_key}}"
secret_key = "{{secret_key}}"
region = "{{region}}"
key = "{{key}}"
bucket = "{{bucket}}"
"#;

const AWS_VARS_TEMPLATE: &str = r#"access_key = "{{access_key}}"
secret_key = "{{secret_key}}"
region = "{{region}}"
vault_addr = "{{vault_addr}}"
vault_role_id = "{{vault_role_id}}"
vault_secret_id = "{{vault_secret_id}}"
"#;

/// Vault login details handed to terraform's vault provider.
#[derive(Clone)]
pub struct VaultAccess {
    pub address: String,
    pub role_id: String,
    pub secret_id: String,
}

impl VaultAccess {
    pub fn new(
        address: impl Into<String>,
        role_id: impl Into<String>,
        secret_id: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            role_id: role_id.into(),
            secret_id: secret_id.into(),
        }
    }
}

impl fmt::Debug for VaultAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultAccess")
            .field("address", &self.address)
            .field("role_id", &"[REDACTED]")
            .field("secret_id", &"[REDACTED]")
            .finish()
    }
}

/// Writes the generated terraform files.
#[derive(Debug, Clone)]
pub struct Materializer {
    renderer: TemplateRenderer,
}

impl Materializer {
    pub fn new() -> TemplateResult<Self> {
        Ok(Self {
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Underlying renderer, shared with other file templates.
    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    fn write(&self, dir: &Path, file: &str, content: &str) -> TemplateResult<PathBuf> {
        let path = dir.join(file);
        fs::write(&path, content)?;
        debug!("Wrote {:?}", path);
        Ok(path)
    }

    fn render_quoted(&self, template: &str, values: &[(&str, &str)]) -> TemplateResult<String> {
        let vars: HashMap<String, String> = values
            .iter()
            .map(|(k, v)| (k.to_string(), escape_hcl(v)))
            .collect();
        self.renderer.render_strict(template, &vars)
    }

    /// Write `s3.tfbackend` into `dir`.
    pub fn render_backend(&self, creds: &CredentialRecord, dir: &Path) -> TemplateResult<PathBuf> {
        let content = self.render_quoted(
            BACKEND_TEMPLATE,
            &[
                ("access_key", creds.access_key.as_str()),
                ("secret_key", creds.secret_key.as_str()),
                ("region", creds.region.as_str()),
                ("key", creds.key.as_str()),
                ("bucket", creds.bucket.as_str()),
            ],
        )?;
        self.write(dir, BACKEND_FILE, &content)
    }

    /// Write `aws.auto.tfvars` into `dir`.
    pub fn render_credential_vars(
        &self,
        creds: &CredentialRecord,
        vault: &VaultAccess,
        dir: &Path,
    ) -> TemplateResult<PathBuf> {
        let content = self.render_quoted(
            AWS_VARS_TEMPLATE,
            &[
                ("access_key", creds.access_key.as_str()),
                ("secret_key", creds.secret_key.as_str()),
                ("region", creds.region.as_str()),
                ("vault_addr", vault.address.as_str()),
                ("vault_role_id", vault.role_id.as_str()),
                ("vault_secret_id", vault.secret_id.as_str()),
            ],
        )?;
        self.write(dir, AWS_VARS_FILE, &content)
    }

    /// Write `input.auto.tfvars` into `dir`, one quoted line per key.
    pub fn render_input_vars(&self, inputs: &KvData, dir: &Path) -> TemplateResult<PathBuf> {
        let mut content = String::new();
        for (key, value) in inputs {
            if !is_identifier(key) {
                return Err(TemplateError::InvalidVariable(key.clone()));
            }
            content.push_str(&format!("{} = \"{}\"\n", key, escape_hcl(&value.to_string())));
        }
        self.write(dir, INPUT_VARS_FILE, &content)
    }
}

/// HCL identifier: a letter or underscore, then letters, digits, `_` or `-`.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("vpc_cidr"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("name-with-dash"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("has space"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_vault_access_debug_hides_ids() {
        let access = VaultAccess::new("https://vault", "role-123", "secret-456");
        let shown = format!("{:?}", access);
        assert!(shown.contains("https://vault"));
        assert!(!shown.contains("role-123"));
        assert!(!shown.contains("secret-456"));
    }
}
