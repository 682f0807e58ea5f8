//! In-memory doubles for the removal machinery tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Mutex;
use uuid::Uuid;

use docvault_core::models::DeletionAuditEntry;
use docvault_core::AppError;
use docvault_storage::{Storage, StorageBackend, StorageError, StorageResult};

use crate::audit_store::DeletionAuditStore;

/// In-memory deletion audit log.
#[derive(Default)]
pub struct MemoryAuditStore {
    entries: Mutex<Vec<DeletionAuditEntry>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pending(attachment_ids: &[Uuid]) -> Self {
        let entries = attachment_ids
            .iter()
            .map(|&attachment_id| DeletionAuditEntry {
                id: Uuid::new_v4(),
                attachment_id,
                created_at: Utc::now(),
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Attachment ids still awaiting a confirmed removal.
    pub fn pending_attachments(&self) -> Vec<Uuid> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.attachment_id)
            .collect()
    }
}

#[async_trait]
impl DeletionAuditStore for MemoryAuditStore {
    async fn append(&self, attachment_id: Uuid) -> Result<DeletionAuditEntry, AppError> {
        let entry = DeletionAuditEntry {
            id: Uuid::new_v4(),
            attachment_id,
            created_at: Utc::now(),
        };
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn list_all(&self) -> Result<Vec<DeletionAuditEntry>, AppError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn clear(&self, entry_id: Uuid) -> Result<(), AppError> {
        self.entries.lock().unwrap().retain(|e| e.id != entry_id);
        Ok(())
    }
}

/// Storage double whose `delete` outcome is scripted per key. The removal
/// machinery only ever deletes, so the other operations report an error.
#[derive(Default)]
pub struct ScriptedStorage {
    missing: HashSet<String>,
    failing: HashSet<String>,
}

impl ScriptedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deleting this attachment's blob reports `NotFound`.
    pub fn missing(mut self, attachment_id: Uuid) -> Self {
        self.missing.insert(attachment_id.to_string());
        self
    }

    /// Deleting this attachment's blob fails transiently.
    pub fn failing(mut self, attachment_id: Uuid) -> Self {
        self.failing.insert(attachment_id.to_string());
        self
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    async fn put(&self, _key: &str, _content_type: &str, _data: Vec<u8>) -> StorageResult<String> {
        Err(StorageError::BackendError("put not scripted".to_string()))
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn download_stream(
        &self,
        key: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.missing.contains(key) {
            Err(StorageError::NotFound(key.to_string()))
        } else if self.failing.contains(key) {
            Err(StorageError::DeleteFailed("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(!self.missing.contains(key))
    }

    async fn ensure_bucket(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
