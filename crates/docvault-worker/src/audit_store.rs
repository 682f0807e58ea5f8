//! Seam over the deletion audit log.
//!
//! The removal queue and the retry sweep only need three operations on the
//! log, so they run against this trait rather than the Postgres repository
//! directly.

use async_trait::async_trait;
use uuid::Uuid;

use docvault_core::models::DeletionAuditEntry;
use docvault_core::AppError;
use docvault_db::DeletionAuditRepository;

#[async_trait]
pub trait DeletionAuditStore: Send + Sync {
    /// Record that this attachment's blob may still exist and must be removed.
    async fn append(&self, attachment_id: Uuid) -> Result<DeletionAuditEntry, AppError>;

    /// Every unconfirmed removal, oldest first.
    async fn list_all(&self) -> Result<Vec<DeletionAuditEntry>, AppError>;

    /// Drop an entry after its removal was confirmed clean.
    async fn clear(&self, entry_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
impl DeletionAuditStore for DeletionAuditRepository {
    async fn append(&self, attachment_id: Uuid) -> Result<DeletionAuditEntry, AppError> {
        DeletionAuditRepository::append(self, attachment_id).await
    }

    async fn list_all(&self) -> Result<Vec<DeletionAuditEntry>, AppError> {
        DeletionAuditRepository::list_all(self).await
    }

    async fn clear(&self, entry_id: Uuid) -> Result<(), AppError> {
        DeletionAuditRepository::clear(self, entry_id).await
    }
}
