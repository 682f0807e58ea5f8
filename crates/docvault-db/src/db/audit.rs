use docvault_core::models::{DeletionAuditEntry, StorageUploadAudit, UploadFailureSnapshot};
use docvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Append-only store for upload-failure snapshots.
#[derive(Clone)]
pub struct UploadAuditRepository {
    pool: PgPool,
}

impl UploadAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, snapshot), fields(db.table = "storage_upload_audits", db.operation = "insert", db.record_id = %snapshot.attachment_id))]
    pub async fn record(
        &self,
        snapshot: UploadFailureSnapshot,
    ) -> Result<StorageUploadAudit, AppError> {
        let audit = sqlx::query_as::<Postgres, StorageUploadAudit>(
            "INSERT INTO storage_upload_audits (attachment_id, document_id, document_name, \
             channel_name, document_type_name, specification_name, related_object_id, \
             related_object_type, attachment_name, mime_type_name, original_filename, \
             failure_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING id, attachment_id, document_id, document_name, channel_name, \
             document_type_name, specification_name, related_object_id, related_object_type, \
             attachment_name, mime_type_name, original_filename, failure_reason, created_at",
        )
        .bind(snapshot.attachment_id)
        .bind(snapshot.document_id)
        .bind(&snapshot.document_name)
        .bind(&snapshot.channel_name)
        .bind(&snapshot.document_type_name)
        .bind(&snapshot.specification_name)
        .bind(&snapshot.related_object_id)
        .bind(&snapshot.related_object_type)
        .bind(&snapshot.attachment_name)
        .bind(&snapshot.mime_type_name)
        .bind(&snapshot.original_filename)
        .bind(&snapshot.failure_reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(audit)
    }
}

/// Deletion audit log: one row per blob whose object-store removal is not yet
/// confirmed. Rows are appended before the removal attempt and cleared only
/// after a clean removal.
#[derive(Clone)]
pub struct DeletionAuditRepository {
    pool: PgPool,
}

impl DeletionAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "deletion_audit_log", db.operation = "insert", db.record_id = %attachment_id))]
    pub async fn append(&self, attachment_id: Uuid) -> Result<DeletionAuditEntry, AppError> {
        let entry = sqlx::query_as::<Postgres, DeletionAuditEntry>(
            "INSERT INTO deletion_audit_log (attachment_id) VALUES ($1) \
             RETURNING id, attachment_id, created_at",
        )
        .bind(attachment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    /// Every unconfirmed removal, oldest first. The retry sweep walks this.
    #[tracing::instrument(skip(self), fields(db.table = "deletion_audit_log", db.operation = "select"))]
    pub async fn list_all(&self) -> Result<Vec<DeletionAuditEntry>, AppError> {
        let entries = sqlx::query_as::<Postgres, DeletionAuditEntry>(
            "SELECT id, attachment_id, created_at FROM deletion_audit_log ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    #[tracing::instrument(skip(self), fields(db.table = "deletion_audit_log", db.operation = "delete", db.record_id = %entry_id))]
    pub async fn clear(&self, entry_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM deletion_audit_log WHERE id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
