//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3-compatible, local filesystem) must implement this
/// trait. The bucket/container is bound at construction time; keys are
/// attachment ids.
///
/// Backends are assumed to fail transiently. Callers never treat a failed
/// delete as fatal: the deletion pipeline records it in the deletion audit
/// log and the sweep retries later.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a blob under the given key and return its external URL.
    async fn put(&self, key: &str, content_type: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Download a blob fully into memory.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Download a blob as a stream of `Bytes` chunks (for large files).
    async fn download_stream(
        &self,
        key: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>>;

    /// Delete a blob. Returns `StorageError::NotFound` if the blob is already
    /// absent, so callers can distinguish a clean no-op from a real failure.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a blob exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Verify the configured container is reachable (and create it where the
    /// backend supports that, e.g. a local directory).
    async fn ensure_bucket(&self) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// A removal outcome that clears a deletion-audit entry: either the blob was
/// deleted, or it was already absent. Everything else is retried later.
pub fn is_clean_removal(result: &StorageResult<()>) -> bool {
    matches!(result, Ok(()) | Err(StorageError::NotFound(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removal_classification() {
        assert!(is_clean_removal(&Ok(())));
        assert!(is_clean_removal(&Err(StorageError::NotFound(
            "gone".to_string()
        ))));
        assert!(!is_clean_removal(&Err(StorageError::DeleteFailed(
            "connection reset".to_string()
        ))));
        assert!(!is_clean_removal(&Err(StorageError::BackendError(
            "503".to_string()
        ))));
    }
}
