//! Reference-data endpoints: channels, document types, specifications,
//! supported mime types, categories. Create/list/delete only; deletes return
//! 409 when the entity is still assigned.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NamedCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VersionedCreate {
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MimeTypeCreate {
    pub name: String,
    pub extension: Option<String>,
}

// Channels

pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NamedCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let channel = state.channels.create(&input.name).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn list_channels(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.channels.list().await?))
}

pub async fn delete_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.channels.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Document types

pub async fn create_document_type(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NamedCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let document_type = state
        .document_types
        .create(&input.name, input.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(document_type)))
}

pub async fn list_document_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.document_types.list().await?))
}

pub async fn delete_document_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.document_types.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Specifications

pub async fn create_specification(
    State(state): State<Arc<AppState>>,
    Json(input): Json<VersionedCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let specification = state
        .specifications
        .create(&input.name, input.version.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(specification)))
}

pub async fn list_specifications(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.specifications.list().await?))
}

pub async fn delete_specification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.specifications.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Mime types

pub async fn create_mime_type(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MimeTypeCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let mime_type = state
        .mime_types
        .create(&input.name, input.extension.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(mime_type)))
}

pub async fn list_mime_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.mime_types.list().await?))
}

pub async fn delete_mime_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.mime_types.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Categories

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NamedCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let category = state
        .categories
        .create(&input.name, input.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.categories.list().await?))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
