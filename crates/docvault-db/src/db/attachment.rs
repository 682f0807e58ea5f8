use chrono::{Duration, Utc};
use docvault_core::models::Attachment;
use docvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const ATTACHMENT_COLUMNS: &str = "id, document_id, name, description, content_type, size_bytes, \
     size_unit, valid_from, valid_to, storage_backend, external_url, mime_type_id, \
     original_filename, storage_upload_status, created_at";

/// Repository for the attachment ledger.
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
}

impl AttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Attachment>, AppError> {
        let attachment = sqlx::query_as::<Postgres, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attachment)
    }

    /// Fetch all requested attachments, failing if any id is unknown.
    ///
    /// Batch operations over a mixed set of ids reject the whole batch before
    /// any side effect, so a stray id cannot partially apply a delete.
    #[tracing::instrument(skip(self, ids), fields(db.table = "attachments", db.operation = "select", count = ids.len()))]
    pub async fn get_strict_many(&self, ids: &[Uuid]) -> Result<Vec<Attachment>, AppError> {
        let attachments = sqlx::query_as::<Postgres, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        if attachments.len() != ids.len() {
            let found: Vec<Uuid> = attachments.iter().map(|a| a.id).collect();
            let missing = ids
                .iter()
                .find(|id| !found.contains(id))
                .copied()
                .unwrap_or_default();
            return Err(AppError::NotFound(format!(
                "Attachment {} not found",
                missing
            )));
        }

        Ok(attachments)
    }

    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "select", db.record_id = %document_id))]
    pub async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Attachment>, AppError> {
        let attachments = sqlx::query_as::<Postgres, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE document_id = $1 ORDER BY created_at"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attachments)
    }

    /// Attachments with bytes actually present in the object store. The
    /// archive endpoint packages only these.
    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "select", db.record_id = %document_id))]
    pub async fn list_uploaded_by_document(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<Attachment>, AppError> {
        let attachments = sqlx::query_as::<Postgres, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments \
             WHERE document_id = $1 AND storage_upload_status = TRUE ORDER BY created_at"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attachments)
    }

    /// Flip the ledger to uploaded after a successful object-store write.
    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "update", db.record_id = %id))]
    pub async fn mark_uploaded(
        &self,
        id: Uuid,
        size_bytes: i64,
        size_unit: &str,
        storage_backend: &str,
        external_url: &str,
        content_type: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE attachments SET storage_upload_status = TRUE, size_bytes = $1, \
             size_unit = $2, storage_backend = $3, external_url = $4, \
             content_type = COALESCE($5, content_type) \
             WHERE id = $6",
        )
        .bind(size_bytes)
        .bind(size_unit)
        .bind(storage_backend)
        .bind(external_url)
        .bind(content_type)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Attachment {} not found", id)));
        }
        Ok(())
    }

    /// First write of the deletion pipeline: the rows stay in place but no
    /// longer count as uploaded. Runs before any object-store delete.
    #[tracing::instrument(skip(self, ids), fields(db.table = "attachments", db.operation = "update", count = ids.len()))]
    pub async fn mark_pending_delete(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        let result =
            sqlx::query("UPDATE attachments SET storage_upload_status = FALSE WHERE id = ANY($1)")
                .bind(ids)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "attachments", db.operation = "delete", count = ids.len()))]
    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove attachment rows whose upload never completed and whose grace
    /// period has lapsed. Returns the number of rows purged.
    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "delete"))]
    pub async fn purge_failed_uploads(&self, grace_hours: i64) -> Result<u64, AppError> {
        let cutoff = Utc::now() - Duration::hours(grace_hours);
        let result = sqlx::query(
            "DELETE FROM attachments WHERE storage_upload_status = FALSE AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
