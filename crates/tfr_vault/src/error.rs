//! Error types for the secrets client.

use thiserror::Error;

/// Result type alias for secrets store operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while talking to the secrets store.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault authentication failed: {0}")]
    Auth(String),

    #[error("No secret found at specified path: {0}")]
    NotFound(String),

    #[error("Invalid secret at path {path}: {message}")]
    Schema { path: String, message: String },

    #[error("Invalid vault path: {0}")]
    InvalidPath(String),

    #[error("No KV secret engine mounted for path: {0}")]
    UnknownMount(String),

    #[error("Invalid KV engine version: {0}")]
    InvalidSchema(String),

    #[error("Failed to write secret to {path}: {message}")]
    Write { path: String, message: String },

    #[error("Vault API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid Vault client settings: {0}")]
    Settings(String),

    #[error("Vault request failed: {0}")]
    Client(#[from] vaultrs::error::ClientError),
}

impl VaultError {
    pub(crate) fn schema(path: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
