//! Error types for rendering.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while materializing configuration files.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Required terraform key `{field}` missing from Vault secret")]
    CredentialExtraction { field: String },

    #[error("Variable not provided: {0}")]
    MissingVariable(String),

    #[error("Invalid variable name: {0}")]
    InvalidVariable(String),

    #[error("Invalid template pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
