use docvault_core::Config;
use docvault_db::{
    AttachmentRepository, CategoryRepository, ChannelRepository, DeletionAuditRepository,
    DocumentRepository, DocumentTypeRepository, MimeTypeRepository, SpecificationRepository,
    UploadAuditRepository,
};
use docvault_storage::Storage;
use docvault_worker::{BlobRemovalQueue, SweeperHandle};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state: configuration, repositories, the storage
/// backend, and the background workers.
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub documents: DocumentRepository,
    pub attachments: AttachmentRepository,
    pub upload_audits: UploadAuditRepository,
    pub deletion_audits: DeletionAuditRepository,
    pub channels: ChannelRepository,
    pub document_types: DocumentTypeRepository,
    pub specifications: SpecificationRepository,
    pub mime_types: MimeTypeRepository,
    pub categories: CategoryRepository,
    pub removal_queue: BlobRemovalQueue,
    pub sweeper: SweeperHandle,
}
