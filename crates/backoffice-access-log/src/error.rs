//! Error types for the log pipeline

use thiserror::Error;

/// Failure reported by a log storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log storage error: {0}")]
    Backend(String),

    #[error("log body serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure while waiting for the batch consumer to stop
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("log consumer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
