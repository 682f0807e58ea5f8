//! Document graph CRUD and criteria search.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use docvault_core::models::{DocumentCreate, DocumentUpdate, SearchCriteria};
use docvault_core::AppError;

use crate::error::HttpAppError;
use crate::services::removal;
use crate::state::AppState;

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Json(input): Json<DocumentCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let graph = state.documents.create(input).await?;
    Ok((StatusCode::CREATED, Json(graph)))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let graph = state
        .documents
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;
    Ok(Json(graph))
}

pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(criteria): Query<SearchCriteria>,
) -> Result<impl IntoResponse, HttpAppError> {
    let documents = state.documents.search(&criteria).await?;
    Ok(Json(documents))
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<DocumentUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let graph = state.documents.update(id, update).await?;
    Ok(Json(graph))
}

/// Delete the document row (cascading the owned collections), then dispatch
/// asynchronous blob removals for every attachment it had. The HTTP response
/// does not wait for the object store; once the row is gone the delete has
/// succeeded, whatever happens to the blobs.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let attachment_ids = state.documents.delete(id).await?;

    removal::dispatch_blob_removals(&state.removal_queue, attachment_ids).await;

    Ok(StatusCode::NO_CONTENT)
}
