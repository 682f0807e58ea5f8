//! Attachment file operations: batch upload, bulk delete, single download,
//! zip archive.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono_tz::Tz;
use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use docvault_core::AppError;

use crate::error::HttpAppError;
use crate::services::{archive, removal, upload};
use crate::state::AppState;

const CLIENT_TIMEZONE_HEADER: &str = "client-timezone";

/// Batch upload of attachment bytes. Always 200 with a per-file outcome map;
/// individual failures are reported inside the map, not as an HTTP error.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcomes = upload::process_upload_batch(&state, document_id, multipart).await?;
    Ok(Json(outcomes))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub attachment_ids: Vec<Uuid>,
}

/// Bulk attachment delete: resolve every id or fail the whole batch, flip
/// the ledger, then hand the blobs to the removal queue.
pub async fn delete_bulk_attachments(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.attachment_ids.is_empty() {
        return Err(AppError::InvalidInput("No attachment ids supplied".to_string()).into());
    }

    let attachments = state
        .attachments
        .get_strict_many(&request.attachment_ids)
        .await?;

    state
        .attachments
        .mark_pending_delete(&request.attachment_ids)
        .await?;

    let attachment_ids = attachments.iter().map(|a| a.id).collect();
    removal::dispatch_blob_removals(&state.removal_queue, attachment_ids).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Stream a single attachment's bytes out of the object store.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(attachment_id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    let attachment = state
        .attachments
        .get(attachment_id)
        .await?
        .filter(|a| a.storage_upload_status)
        .ok_or_else(|| AppError::NotFound(format!("Attachment {} not found", attachment_id)))?;

    let stream = state
        .storage
        .download_stream(&attachment.storage_key())
        .await
        .map_err(HttpAppError::from)?;

    let body = Body::from_stream(stream.map(|chunk| chunk.map_err(std::io::Error::other)));

    let content_type = attachment
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    let filename = attachment
        .original_filename
        .as_deref()
        .unwrap_or("attachment");
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(filename, NON_ALPHANUMERIC)
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Zip archive of every uploaded attachment on a document.
///
/// 204 No Content both when the document does not exist and when it has no
/// uploaded attachments: either way there is nothing to package.
pub async fn download_archive(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let attachments = state
        .attachments
        .list_uploaded_by_document(document_id)
        .await?;

    if attachments.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let timezone = client_timezone(&headers);
    let archive =
        archive::build_zip_archive(state.storage.as_ref(), &attachments, timezone).await?;

    let disposition = format!("attachment; filename=\"document_{}.zip\"", document_id);
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(archive))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Parse the `client-timezone` header, falling back to UTC on anything
/// missing or unparseable.
fn client_timezone(headers: &HeaderMap) -> Tz {
    headers
        .get(CLIENT_TIMEZONE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Tz>().ok())
        .unwrap_or(chrono_tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_timezone_parses_iana_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CLIENT_TIMEZONE_HEADER,
            HeaderValue::from_static("Europe/Berlin"),
        );
        assert_eq!(client_timezone(&headers), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_client_timezone_defaults_to_utc() {
        assert_eq!(client_timezone(&HeaderMap::new()), chrono_tz::UTC);

        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_TIMEZONE_HEADER, HeaderValue::from_static("Mars/Gale"));
        assert_eq!(client_timezone(&headers), chrono_tz::UTC);
    }
}
