use thiserror::Error;

use crate::tree::NodeId;

/// Top-level error type for the rd-core crate and dependents.
#[derive(Debug, Error)]
pub enum RdError {
    /// A record-similarity lookup asked for a pair that the clustering phase
    /// never scored. Aborts the current extraction.
    #[error("similarity cache miss for pair ({left}, {right})")]
    SimilarityCacheMiss { left: NodeId, right: NodeId },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown encoding label: {0}")]
    UnknownEncoding(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, RdError>;
