//! Application setup and initialization.

pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use std::sync::Arc;

use docvault_core::Config;
use docvault_db::{
    AttachmentRepository, CategoryRepository, ChannelRepository, DeletionAuditRepository,
    DocumentRepository, DocumentTypeRepository, MimeTypeRepository, SpecificationRepository,
    UploadAuditRepository,
};
use docvault_worker::{
    BlobRemovalQueue, DeletionAuditStore, RemovalQueueConfig, Sweeper, SweeperConfig,
};

use crate::state::AppState;

/// Initialize the entire application: database, storage, background workers,
/// shared state and routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let pool = docvault_db::connect(&config)
        .await
        .context("Failed to connect to database")?;
    docvault_db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database connected and migrated");

    let storage = docvault_storage::create_storage(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize storage backend: {}", e))?;
    storage
        .ensure_bucket()
        .await
        .map_err(|e| anyhow::anyhow!("Storage container unavailable: {}", e))?;
    tracing::info!(backend = %storage.backend_type(), "Storage backend ready");

    let attachments = AttachmentRepository::new(pool.clone());
    let deletion_audits = DeletionAuditRepository::new(pool.clone());

    let audit_store: Arc<dyn DeletionAuditStore> = Arc::new(deletion_audits.clone());

    let removal_queue = BlobRemovalQueue::new(
        audit_store.clone(),
        storage.clone(),
        RemovalQueueConfig {
            max_workers: config.removal_queue_workers,
            capacity: config.removal_queue_capacity,
        },
    );

    let sweeper = Sweeper::new(
        attachments.clone(),
        audit_store,
        storage.clone(),
        SweeperConfig::from_config(&config),
    )
    .spawn();

    let state = Arc::new(AppState {
        documents: DocumentRepository::new(pool.clone()),
        attachments,
        upload_audits: UploadAuditRepository::new(pool.clone()),
        deletion_audits,
        channels: ChannelRepository::new(pool.clone()),
        document_types: DocumentTypeRepository::new(pool.clone()),
        specifications: SpecificationRepository::new(pool.clone()),
        mime_types: MimeTypeRepository::new(pool.clone()),
        categories: CategoryRepository::new(pool.clone()),
        removal_queue,
        sweeper,
        storage,
        pool,
        config,
    });

    let router = routes::setup_routes(state.clone())?;

    Ok((state, router))
}
