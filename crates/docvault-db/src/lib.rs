//! Database repositories for the docvault data access layer
//!
//! Repositories are organized by domain entity: documents (graph persistence
//! and criteria search), attachments (the ledger), audits (the two
//! failure-capture tables), and reference data (channels, types,
//! specifications, mime types, categories).

pub mod db;

pub use db::attachment::AttachmentRepository;
pub use db::audit::{DeletionAuditRepository, UploadAuditRepository};
pub use db::document::{DocumentRepository, UploadContext};
pub use db::reference::{
    CategoryRepository, ChannelRepository, DocumentTypeRepository, MimeTypeRepository,
    SpecificationRepository,
};

use docvault_core::{AppError, Config};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres using the configured URL and pool sizing.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}
