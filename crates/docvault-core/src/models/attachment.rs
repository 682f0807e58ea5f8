use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attachment ledger row.
///
/// The relational row is authoritative for whether the attachment logically
/// exists; the object store holds the bytes under key = attachment id.
/// `storage_upload_status` is true only after a successful object-store write
/// and flips back to false when the attachment is marked for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub size_unit: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub storage_backend: Option<String>,
    pub external_url: Option<String>,
    pub mime_type_id: Uuid,
    pub original_filename: Option<String>,
    pub storage_upload_status: bool,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    /// Object-store key for this attachment: the id itself, no path prefix.
    pub fn storage_key(&self) -> String {
        self.id.to_string()
    }
}
