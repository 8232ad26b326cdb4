//! Error types for the caching worker

use thiserror::Error;

/// Result type for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors that can occur in the caching worker
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Network fetch failed (no connectivity, transport error)
    #[error("Network request failed: {0}")]
    Network(String),

    /// Cache-only strategy found nothing to serve
    #[error("No cached response available for {0}")]
    NoCachedResponse(String),

    /// Underlying cache store failed
    #[error("Cache store error: {0}")]
    Store(String),

    /// Precaching a resource failed during install
    #[error("Precache failed for {url}: {reason}")]
    PrecacheFailed { url: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
