//! Blob removal dispatch.
//!
//! By the time removals are dispatched the attachment rows are already gone
//! from the ledger (or flipped to pending-delete), so the HTTP request has
//! succeeded no matter what happens here. A dispatch failure is logged and
//! the loop moves on; it must never turn a committed delete into an error
//! response.

use uuid::Uuid;

use docvault_worker::BlobRemovalQueue;

pub async fn dispatch_blob_removals(queue: &BlobRemovalQueue, attachment_ids: Vec<Uuid>) {
    for attachment_id in attachment_ids {
        if let Err(e) = queue.enqueue(attachment_id).await {
            tracing::error!(
                attachment_id = %attachment_id,
                error = %e,
                "Blob removal could not be dispatched, blob stays until cleaned up manually"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    use docvault_core::models::DeletionAuditEntry;
    use docvault_core::AppError;
    use docvault_storage::LocalStorage;
    use docvault_worker::{DeletionAuditStore, RemovalQueueConfig};

    /// Audit store whose append fails for one designated attachment.
    struct FlakyAuditStore {
        poisoned: Uuid,
        appended: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl DeletionAuditStore for FlakyAuditStore {
        async fn append(&self, attachment_id: Uuid) -> Result<DeletionAuditEntry, AppError> {
            if attachment_id == self.poisoned {
                return Err(AppError::Internal("audit log unavailable".to_string()));
            }
            self.appended.lock().unwrap().push(attachment_id);
            Ok(DeletionAuditEntry {
                id: Uuid::new_v4(),
                attachment_id,
                created_at: Utc::now(),
            })
        }

        async fn list_all(&self) -> Result<Vec<DeletionAuditEntry>, AppError> {
            Ok(Vec::new())
        }

        async fn clear(&self, _entry_id: Uuid) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_continues_past_enqueue_failure() {
        let poisoned = Uuid::new_v4();
        let survivor = Uuid::new_v4();

        let store = Arc::new(FlakyAuditStore {
            poisoned,
            appended: Mutex::new(Vec::new()),
        });
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost:8080".to_string())
                .await
                .unwrap(),
        );

        let queue = BlobRemovalQueue::new(store.clone(), storage, RemovalQueueConfig::default());

        // The poisoned id fails to dispatch; the one after it must still be
        // handed to the queue.
        dispatch_blob_removals(&queue, vec![poisoned, survivor]).await;

        assert_eq!(*store.appended.lock().unwrap(), vec![survivor]);
        queue.shutdown().await;
    }
}
