//! Route configuration.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use docvault_core::Config;

use crate::handlers::{documents, files, health, reference};
use crate::state::AppState;

pub fn setup_routes(state: Arc<AppState>) -> Result<Router> {
    let cors = setup_cors(&state.config)?;
    let max_body = state.config.max_upload_body_bytes;

    let router = Router::new()
        .route("/health", get(health::health_check))
        // Document graph
        .route(
            "/document",
            post(documents::create_document).get(documents::search_documents),
        )
        .route(
            "/document/{id}",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        // Attachment files
        .route("/document/files/upload/{id}", post(files::upload_files))
        .route(
            "/document/file/delete-bulk-attachment",
            delete(files::delete_bulk_attachments),
        )
        .route("/document/file/{id}", get(files::download_file))
        .route(
            "/document/file/{id}/attachments",
            get(files::download_archive),
        )
        // Reference data
        .route(
            "/channels",
            post(reference::create_channel).get(reference::list_channels),
        )
        .route("/channels/{id}", delete(reference::delete_channel))
        .route(
            "/document-types",
            post(reference::create_document_type).get(reference::list_document_types),
        )
        .route(
            "/document-types/{id}",
            delete(reference::delete_document_type),
        )
        .route(
            "/specifications",
            post(reference::create_specification).get(reference::list_specifications),
        )
        .route(
            "/specifications/{id}",
            delete(reference::delete_specification),
        )
        .route(
            "/mime-types",
            post(reference::create_mime_type).get(reference::list_mime_types),
        )
        .route("/mime-types/{id}", delete(reference::delete_mime_type))
        .route(
            "/categories",
            post(reference::create_category).get(reference::list_categories),
        )
        .route("/categories/{id}", delete(reference::delete_category))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(RequestBodyLimitLayer::new(max_body))
        .with_state(state);

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    if config.cors_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any))
}
