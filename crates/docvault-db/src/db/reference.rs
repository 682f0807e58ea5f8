//! Reference-data repositories.
//!
//! Deleting a reference entity that documents or attachments still point at
//! is a conflict of assignment, reported as 409 rather than surfacing a
//! foreign-key violation.

use docvault_core::models::{
    Category, Channel, DocumentSpecification, DocumentType, SupportedMimeType,
};
use docvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

async fn ensure_unreferenced(
    pool: &PgPool,
    referencing_table: &str,
    column: &str,
    id: Uuid,
    label: &str,
) -> Result<(), AppError> {
    let in_use = sqlx::query_scalar::<Postgres, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {referencing_table} WHERE {column} = $1)"
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;
    if in_use {
        return Err(AppError::Conflict(format!(
            "{} {} is still assigned and cannot be deleted",
            label, id
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ChannelRepository {
    pool: PgPool,
}

impl ChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "channels", db.operation = "insert"))]
    pub async fn create(&self, name: &str) -> Result<Channel, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Channel name is required".into()));
        }
        let channel = sqlx::query_as::<Postgres, Channel>(
            "INSERT INTO channels (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(channel)
    }

    #[tracing::instrument(skip(self), fields(db.table = "channels", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Channel>, AppError> {
        let channels =
            sqlx::query_as::<Postgres, Channel>("SELECT id, name FROM channels ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(channels)
    }

    #[tracing::instrument(skip(self), fields(db.table = "channels", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        ensure_unreferenced(&self.pool, "documents", "channel_id", id, "Channel").await?;
        let result = sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Channel {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct DocumentTypeRepository {
    pool: PgPool,
}

impl DocumentTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.operation = "insert"))]
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<DocumentType, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Document type name is required".into(),
            ));
        }
        let document_type = sqlx::query_as::<Postgres, DocumentType>(
            "INSERT INTO document_types (name, description) VALUES ($1, $2) \
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(document_type)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<DocumentType>, AppError> {
        let types = sqlx::query_as::<Postgres, DocumentType>(
            "SELECT id, name, description FROM document_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        ensure_unreferenced(&self.pool, "documents", "document_type_id", id, "Document type")
            .await?;
        let result = sqlx::query("DELETE FROM document_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Document type {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SpecificationRepository {
    pool: PgPool,
}

impl SpecificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_specifications", db.operation = "insert"))]
    pub async fn create(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<DocumentSpecification, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Specification name is required".into(),
            ));
        }
        let specification = sqlx::query_as::<Postgres, DocumentSpecification>(
            "INSERT INTO document_specifications (name, version) VALUES ($1, $2) \
             RETURNING id, name, version",
        )
        .bind(name)
        .bind(version)
        .fetch_one(&self.pool)
        .await?;
        Ok(specification)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_specifications", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<DocumentSpecification>, AppError> {
        let specifications = sqlx::query_as::<Postgres, DocumentSpecification>(
            "SELECT id, name, version FROM document_specifications ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(specifications)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_specifications", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        ensure_unreferenced(
            &self.pool,
            "documents",
            "specification_id",
            id,
            "Document specification",
        )
        .await?;
        let result = sqlx::query("DELETE FROM document_specifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Document specification {} not found",
                id
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MimeTypeRepository {
    pool: PgPool,
}

impl MimeTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "supported_mime_types", db.operation = "insert"))]
    pub async fn create(
        &self,
        name: &str,
        extension: Option<&str>,
    ) -> Result<SupportedMimeType, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Mime type name is required".into()));
        }
        let mime_type = sqlx::query_as::<Postgres, SupportedMimeType>(
            "INSERT INTO supported_mime_types (name, extension) VALUES ($1, $2) \
             RETURNING id, name, extension",
        )
        .bind(name)
        .bind(extension)
        .fetch_one(&self.pool)
        .await?;
        Ok(mime_type)
    }

    #[tracing::instrument(skip(self), fields(db.table = "supported_mime_types", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<SupportedMimeType>, AppError> {
        let mime_types = sqlx::query_as::<Postgres, SupportedMimeType>(
            "SELECT id, name, extension FROM supported_mime_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(mime_types)
    }

    #[tracing::instrument(skip(self), fields(db.table = "supported_mime_types", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<SupportedMimeType>, AppError> {
        let mime_type = sqlx::query_as::<Postgres, SupportedMimeType>(
            "SELECT id, name, extension FROM supported_mime_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(mime_type)
    }

    #[tracing::instrument(skip(self), fields(db.table = "supported_mime_types", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        ensure_unreferenced(&self.pool, "attachments", "mime_type_id", id, "Mime type").await?;
        let result = sqlx::query("DELETE FROM supported_mime_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Mime type {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "insert"))]
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Category name is required".into()));
        }
        let category = sqlx::query_as::<Postgres, Category>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) \
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<Postgres, Category>(
            "SELECT id, name, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        ensure_unreferenced(
            &self.pool,
            "document_categories",
            "category_id",
            id,
            "Category",
        )
        .await?;
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }
        Ok(())
    }
}
