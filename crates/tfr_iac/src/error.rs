//! Error types for the provisioning driver.

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while driving terraform.
///
/// Step failures carry the captured stderr of the terraform process.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Terraform init failed: {0}")]
    InitFailed(String),

    #[error("Terraform plan failed: {0}")]
    PlanFailed(String),

    #[error("Terraform apply failed: {0}")]
    ApplyFailed(String),

    #[error("Terraform destroy failed: {0}")]
    DestroyFailed(String),

    #[error("Terraform output failed: {0}")]
    OutputFailed(String),

    #[error("Terraform show failed: {0}")]
    ShowFailed(String),

    #[error(
        "repository '{target}' is not using 'use_fips_endpoint = true' for the AWS provider despite the repo requiring fips"
    )]
    ComplianceFailed { target: String },

    #[error("Invalid terraform version: {0:?}")]
    InvalidVersion(String),

    #[error("Runner error: {0}")]
    Runner(#[from] tfr_runner::RunnerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
