//! Upload pipeline: multipart batch ingestion with per-file outcomes.
//!
//! Each file part is an independent unit of work. One blob failing to land
//! in the object store must not fail the batch, so the result is a map from
//! `"<attachmentId>/<filename>"` to an HTTP-ish status code: 201 when the
//! ledger was flipped to uploaded, 500 when the attempt failed and an audit
//! snapshot was written instead. File parts that cannot be paired with an
//! attachment of the document are skipped and never appear in the map.

use axum::extract::Multipart;
use std::collections::BTreeMap;
use uuid::Uuid;

use docvault_core::models::{Attachment, UploadFailureSnapshot};
use docvault_core::AppError;
use docvault_db::UploadContext;

use crate::state::AppState;

const ATTACHMENT_IDS_FIELD: &str = "attachmentIds";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub const OUTCOME_UPLOADED: u16 = 201;
pub const OUTCOME_FAILED: u16 = 500;

struct RawFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Ingest a multipart batch for one document.
///
/// An optional leading `attachmentIds` text part carries a comma-separated
/// ordered id list; file parts are paired with those ids in order. Without
/// it, each file part is matched against the document's attachments by
/// filename equality. Either way, an unmatched file part is silently
/// skipped.
pub async fn process_upload_batch(
    state: &AppState,
    document_id: Uuid,
    mut multipart: Multipart,
) -> Result<BTreeMap<String, u16>, AppError> {
    let context = state
        .documents
        .get_upload_context(document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", document_id)))?;

    let mut ordered_ids: Vec<Uuid> = Vec::new();
    let mut files: Vec<RawFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            if field_name == ATTACHMENT_IDS_FIELD {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Unreadable id list: {}", e)))?;
                ordered_ids = parse_attachment_ids(&raw)?;
            }
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Unreadable file part: {}", e)))?
            .to_vec();

        files.push(RawFile {
            filename,
            content_type,
            data,
        });
    }

    let paired = pair_files(state, document_id, &ordered_ids, files).await?;

    let mut outcomes = BTreeMap::new();
    for (attachment, file) in paired {
        let key = format!("{}/{}", attachment.id, file.filename);
        let outcome = upload_one(state, &context, attachment, file).await;
        outcomes.insert(key, outcome);
    }

    Ok(outcomes)
}

/// Pair file parts with attachment rows.
///
/// With an id list the pairing is positional; ids that resolve to no
/// attachment of this document drop their part. Without a list, parts are
/// matched by filename equality against the document's attachments.
async fn pair_files(
    state: &AppState,
    document_id: Uuid,
    ordered_ids: &[Uuid],
    files: Vec<RawFile>,
) -> Result<Vec<(Attachment, RawFile)>, AppError> {
    let mut paired = Vec::new();

    if !ordered_ids.is_empty() {
        for (index, file) in files.into_iter().enumerate() {
            let Some(attachment_id) = ordered_ids.get(index).copied() else {
                tracing::debug!(filename = %file.filename, "Skipping file part beyond the id list");
                continue;
            };
            match state.attachments.get(attachment_id).await? {
                Some(attachment) if attachment.document_id == document_id => {
                    paired.push((attachment, file));
                }
                _ => {
                    tracing::debug!(
                        attachment_id = %attachment_id,
                        filename = %file.filename,
                        "Skipping file part whose id matches no attachment of this document"
                    );
                }
            }
        }
        return Ok(paired);
    }

    let candidates = state.attachments.list_by_document(document_id).await?;
    for file in files {
        match match_by_filename(&candidates, &file.filename) {
            Some(attachment) => paired.push((attachment.clone(), file)),
            None => {
                tracing::debug!(
                    filename = %file.filename,
                    "Skipping file part matching no attachment filename"
                );
            }
        }
    }

    Ok(paired)
}

/// Filename-equality matching: the attachment's original filename when it
/// has one, its name otherwise.
fn match_by_filename<'a>(attachments: &'a [Attachment], filename: &str) -> Option<&'a Attachment> {
    attachments
        .iter()
        .find(|a| match a.original_filename.as_deref() {
            Some(original) => original == filename,
            None => a.name == filename,
        })
}

fn parse_attachment_ids(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Uuid>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid attachment id: {}", s)))
        })
        .collect()
}

/// One file's journey: object-store write first, ledger flip second. On any
/// failure the ledger stays false and an audit snapshot captures the context.
async fn upload_one(state: &AppState, context: &UploadContext, attachment: Attachment, file: RawFile) -> u16 {
    let content_type = file
        .content_type
        .clone()
        .or_else(|| attachment.content_type.clone())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let size_bytes = file.data.len() as i64;

    let put_result = state
        .storage
        .put(&attachment.storage_key(), &content_type, file.data)
        .await;

    let failure_reason = match put_result {
        Ok(url) => {
            match state
                .attachments
                .mark_uploaded(
                    attachment.id,
                    size_bytes,
                    "bytes",
                    state.storage.backend_type().as_str(),
                    &url,
                    Some(&content_type),
                )
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        attachment_id = %attachment.id,
                        size_bytes,
                        "Attachment uploaded"
                    );
                    return OUTCOME_UPLOADED;
                }
                Err(e) => format!("Blob stored but ledger update failed: {}", e),
            }
        }
        Err(e) => format!("Object store write failed: {}", e),
    };

    tracing::error!(
        attachment_id = %attachment.id,
        document_id = %context.document_id,
        reason = %failure_reason,
        "Attachment upload failed"
    );

    record_failure(state, context, &attachment, &failure_reason).await;
    OUTCOME_FAILED
}

async fn record_failure(
    state: &AppState,
    context: &UploadContext,
    attachment: &Attachment,
    failure_reason: &str,
) {
    let mime_type_name = match state.mime_types.get(attachment.mime_type_id).await {
        Ok(Some(mime)) => mime.name,
        _ => "unknown".to_string(),
    };

    let snapshot = UploadFailureSnapshot {
        attachment_id: attachment.id,
        document_id: context.document_id,
        document_name: context.document_name.clone(),
        channel_name: context.channel_name.clone(),
        document_type_name: context.document_type_name.clone(),
        specification_name: context.specification_name.clone(),
        related_object_id: context.related_object_id.clone(),
        related_object_type: context.related_object_type.clone(),
        attachment_name: attachment.name.clone(),
        mime_type_name,
        original_filename: attachment.original_filename.clone(),
        failure_reason: failure_reason.to_string(),
    };

    if let Err(e) = state.upload_audits.record(snapshot).await {
        tracing::error!(
            attachment_id = %attachment.id,
            error = %e,
            "Upload failure could not be audited"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pending_attachment(name: &str, original_filename: Option<&str>) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            content_type: None,
            size_bytes: None,
            size_unit: None,
            valid_from: None,
            valid_to: None,
            storage_backend: None,
            external_url: None,
            mime_type_id: Uuid::new_v4(),
            original_filename: original_filename.map(String::from),
            storage_upload_status: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_attachment_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{}, {} ,", a, b);
        assert_eq!(parse_attachment_ids(&raw).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_parse_attachment_ids_rejects_garbage() {
        assert!(parse_attachment_ids("not-a-uuid").is_err());
    }

    #[test]
    fn test_parse_attachment_ids_empty_list() {
        assert!(parse_attachment_ids("").unwrap().is_empty());
    }

    #[test]
    fn test_match_by_filename_equality() {
        let contract = pending_attachment("Contract", Some("contract.pdf"));
        let invoice = pending_attachment("Invoice", Some("invoice.pdf"));
        let attachments = vec![contract.clone(), invoice];

        // A generic part name plays no role; only the filename matters.
        let matched = match_by_filename(&attachments, "contract.pdf").unwrap();
        assert_eq!(matched.id, contract.id);
    }

    #[test]
    fn test_match_by_filename_falls_back_to_name() {
        let unnamed = pending_attachment("scan.png", None);
        let attachments = vec![unnamed.clone()];

        let matched = match_by_filename(&attachments, "scan.png").unwrap();
        assert_eq!(matched.id, unnamed.id);
    }

    #[test]
    fn test_match_by_filename_unmatched_is_none() {
        let attachments = vec![pending_attachment("Contract", Some("contract.pdf"))];
        assert!(match_by_filename(&attachments, "stranger.pdf").is_none());
    }

    #[test]
    fn test_match_by_filename_original_filename_shadows_name() {
        // When an original filename exists, the name alone must not match.
        let attachments = vec![pending_attachment("report.txt", Some("report_final.txt"))];
        assert!(match_by_filename(&attachments, "report.txt").is_none());
        assert!(match_by_filename(&attachments, "report_final.txt").is_some());
    }
}
