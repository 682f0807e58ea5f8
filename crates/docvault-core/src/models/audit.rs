use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable snapshot written when an attachment upload fails.
///
/// Denormalized on purpose: the live document and attachment rows may change
/// or disappear after the failure, so the snapshot carries enough identifying
/// context for later diagnosis on its own. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StorageUploadAudit {
    pub id: Uuid,
    pub attachment_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub channel_name: String,
    pub document_type_name: String,
    pub specification_name: Option<String>,
    pub related_object_id: Option<String>,
    pub related_object_type: Option<String>,
    pub attachment_name: String,
    pub mime_type_name: String,
    pub original_filename: Option<String>,
    pub failure_reason: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a new upload-failure snapshot (id and timestamp are assigned on insert).
#[derive(Debug, Clone)]
pub struct UploadFailureSnapshot {
    pub attachment_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub channel_name: String,
    pub document_type_name: String,
    pub specification_name: Option<String>,
    pub related_object_id: Option<String>,
    pub related_object_type: Option<String>,
    pub attachment_name: String,
    pub mime_type_name: String,
    pub original_filename: Option<String>,
    pub failure_reason: String,
}

/// Deletion audit log entry: this attachment's blob may still exist in the
/// object store and must be retried. Removed only after a clean removal
/// (success or confirmed-absent).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeletionAuditEntry {
    pub id: Uuid,
    pub attachment_id: Uuid,
    pub created_at: DateTime<Utc>,
}
