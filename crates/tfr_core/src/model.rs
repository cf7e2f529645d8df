//! Run input: the declared set of terraform repositories.

use std::collections::HashSet;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use tfr_templates::BackendOverride;
use tfr_vault::SecretRef;

use crate::error::{CoreError, CoreResult};

/// Decoded config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub repos: Vec<Target>,
}

/// One terraform repository to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(rename = "repository")]
    pub url: String,
    /// Root module location inside the checkout.
    #[serde(rename = "project_path")]
    pub path: String,
    #[serde(rename = "ref")]
    pub revision: String,
    #[serde(default)]
    pub delete: bool,
    pub aws_creds: SecretRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Prefix of the state object key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_path: Option<String>,
    #[serde(default)]
    pub require_fips: bool,
    pub tf_version: String,
    #[serde(default)]
    pub variables: TfVariables,
}

/// Vault secrets holding terraform input and output variables.
///
/// An empty path means the secret is not used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfVariables {
    #[serde(default)]
    pub inputs: SecretRef,
    #[serde(default)]
    pub outputs: SecretRef,
}

impl Target {
    pub fn input_secret(&self) -> Option<&SecretRef> {
        Some(&self.variables.inputs).filter(|s| s.is_set())
    }

    pub fn output_secret(&self) -> Option<&SecretRef> {
        Some(&self.variables.outputs).filter(|s| s.is_set())
    }

    /// Explicit backend settings, which take precedence over the secret.
    pub fn backend_override(&self) -> BackendOverride {
        BackendOverride {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            prefix: self.bucket_path.clone(),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> CoreError {
        CoreError::InvalidTarget {
            target: self.name.clone(),
            message: message.into(),
        }
    }

    /// Check the fields that end up in filesystem paths.
    pub fn validate(&self) -> CoreResult<()> {
        if !is_single_component(&self.name) {
            return Err(self.invalid("name must be a single path component"));
        }
        if !is_single_component(&self.tf_version) {
            return Err(self.invalid("tf_version must be a single path component"));
        }
        let project = Path::new(&self.path);
        if project.is_absolute()
            || project
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(self.invalid("project_path must be relative and stay inside the repository"));
        }
        if self.url.trim().is_empty() {
            return Err(self.invalid("repository must be set"));
        }
        if self.revision.trim().is_empty() {
            return Err(self.invalid("ref must be set"));
        }
        if !self.aws_creds.is_set() {
            return Err(self.invalid("aws_creds path must be set"));
        }
        Ok(())
    }
}

impl RunInput {
    /// Validate every target and reject duplicate names.
    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        for target in &self.repos {
            target.validate()?;
            if !seen.insert(target.name.as_str()) {
                return Err(target.invalid("duplicate target name"));
            }
        }
        Ok(())
    }
}

fn is_single_component(value: &str) -> bool {
    !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}
