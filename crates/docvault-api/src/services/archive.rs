//! Zip packaging of a document's uploaded attachments.

use chrono::{Datelike, Timelike};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use docvault_core::models::Attachment;
use docvault_core::AppError;
use docvault_storage::Storage;

use crate::error::storage_to_app_error;

/// Sanitize filename for archive entry to prevent path traversal.
/// Extracts only the base name (strips path components like `../`).
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Build a zip of the given attachments, entries named by original filename
/// and stamped with the attachment creation time in the client's timezone.
///
/// A single blob failing to download fails the whole archive: a partial zip
/// that silently omits files would look complete to the caller.
pub async fn build_zip_archive(
    storage: &dyn Storage,
    attachments: &[Attachment],
    timezone: Tz,
) -> Result<Vec<u8>, AppError> {
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let mut used_names: HashSet<String> = HashSet::new();

        for attachment in attachments {
            let data = storage
                .download(&attachment.storage_key())
                .await
                .map_err(storage_to_app_error)?;

            let fallback = format!("attachment_{}", attachment.id);
            let mut entry_name = sanitize_archive_filename(
                attachment.original_filename.as_deref().unwrap_or(&fallback),
                &fallback,
            );
            if !used_names.insert(entry_name.clone()) {
                entry_name = format!("{}_{}", attachment.id, entry_name);
                used_names.insert(entry_name.clone());
            }

            let mut options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o644);

            let local = attachment.created_at.with_timezone(&timezone);
            if let Ok(modified) = zip::DateTime::from_date_and_time(
                local.year() as u16,
                local.month() as u8,
                local.day() as u8,
                local.hour() as u8,
                local.minute() as u8,
                local.second() as u8,
            ) {
                options = options.last_modified_time(modified);
            }

            zip.start_file(&entry_name, options).map_err(|e| {
                AppError::Internal(format!("Failed to add zip entry {}: {}", entry_name, e))
            })?;
            zip.write_all(&data).map_err(|e| {
                AppError::Internal(format!("Failed to write zip entry {}: {}", entry_name, e))
            })?;
        }

        zip.finish()
            .map_err(|e| AppError::Internal(format!("Failed to finalize zip archive: {}", e)))?;
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docvault_storage::LocalStorage;
    use uuid::Uuid;

    #[test]
    fn test_sanitize_archive_filename() {
        assert_eq!(
            sanitize_archive_filename("../../etc/passwd", "fallback"),
            "passwd"
        );
        assert_eq!(sanitize_archive_filename("report.pdf", "fb"), "report.pdf");
        assert_eq!(sanitize_archive_filename("..", "fb"), "fb");
        assert_eq!(sanitize_archive_filename("", "fb"), "fb");
    }

    fn uploaded_attachment(id: Uuid, filename: &str) -> Attachment {
        Attachment {
            id,
            document_id: Uuid::new_v4(),
            name: filename.to_string(),
            description: None,
            content_type: Some("text/plain".to_string()),
            size_bytes: None,
            size_unit: None,
            valid_from: None,
            valid_to: None,
            storage_backend: Some("local".to_string()),
            external_url: None,
            mime_type_id: Uuid::new_v4(),
            original_filename: Some(filename.to_string()),
            storage_upload_status: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_zip_archive_contains_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost/files".to_string())
            .await
            .unwrap();

        let a = uploaded_attachment(Uuid::new_v4(), "contract.txt");
        let b = uploaded_attachment(Uuid::new_v4(), "invoice.txt");
        storage
            .put(&a.storage_key(), "text/plain", b"contract body".to_vec())
            .await
            .unwrap();
        storage
            .put(&b.storage_key(), "text/plain", b"invoice body".to_vec())
            .await
            .unwrap();

        let archive = build_zip_archive(&storage, &[a, b], chrono_tz::UTC)
            .await
            .unwrap();

        assert!(archive.starts_with(b"PK"));
        let reader = std::io::Cursor::new(archive);
        let mut zip = zip::ZipArchive::new(reader).unwrap();
        assert_eq!(zip.len(), 2);
        assert!(zip.by_name("contract.txt").is_ok());
    }

    #[tokio::test]
    async fn test_zip_archive_missing_blob_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost/files".to_string())
            .await
            .unwrap();

        let orphan = uploaded_attachment(Uuid::new_v4(), "gone.txt");
        let result = build_zip_archive(&storage, &[orphan], chrono_tz::UTC).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_zip_archive_deduplicates_entry_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost/files".to_string())
            .await
            .unwrap();

        let a = uploaded_attachment(Uuid::new_v4(), "report.txt");
        let b = uploaded_attachment(Uuid::new_v4(), "report.txt");
        for att in [&a, &b] {
            storage
                .put(&att.storage_key(), "text/plain", b"body".to_vec())
                .await
                .unwrap();
        }

        let archive = build_zip_archive(&storage, &[a, b.clone()], chrono_tz::UTC)
            .await
            .unwrap();
        let reader = std::io::Cursor::new(archive);
        let mut zip = zip::ZipArchive::new(reader).unwrap();
        assert_eq!(zip.len(), 2);
        assert!(zip.by_name(&format!("{}_report.txt", b.id)).is_ok());
    }
}
