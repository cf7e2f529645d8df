//! Destination for human-readable state snapshots.

use async_trait::async_trait;

/// State of one target after a successful apply or destroy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub target: String,
    pub source_url: String,
    pub revision: String,
    /// Output of `terraform show -no-color`.
    pub state: String,
}

/// Stores state snapshots somewhere durable.
///
/// Archival is best-effort: the driver logs a failure and carries on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateSink: Send + Sync {
    async fn archive(&self, snapshot: &StateSnapshot) -> anyhow::Result<()>;
}
