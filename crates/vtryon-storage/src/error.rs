//! Storage error types.

use thiserror::Error;
use vtryon_media::MediaError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while storing results or fetching garments.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Garment fetch failed: {0}")]
    FetchFailed(String),

    #[error("Garment fetch timed out after {seconds}s: {url}")]
    FetchTimeout { url: String, seconds: u64 },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl StorageError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    /// Whether the failure came from the remote garment host.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::FetchFailed(_) | Self::FetchTimeout { .. })
    }
}
