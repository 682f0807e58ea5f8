use docvault_core::merge::{merge_collection, merge_id_set, RemovalPolicy};
use docvault_core::models::{
    Attachment, AttachmentInput, Category, CharacteristicInput, Document, DocumentCharacteristic,
    DocumentCreate, DocumentGraph, DocumentRelationship, DocumentUpdate, RelatedPartyInput,
    RelatedPartyRef, RelationshipInput, SearchCriteria,
};
use docvault_core::AppError;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "id, name, description, version, lifecycle_state, tags, \
     channel_id, document_type_id, specification_id, related_object_id, related_object_type, \
     created_by, created_at, updated_at";

const ATTACHMENT_COLUMNS: &str = "id, document_id, name, description, content_type, size_bytes, \
     size_unit, valid_from, valid_to, storage_backend, external_url, mime_type_id, \
     original_filename, storage_upload_status, created_at";

/// Denormalized document context used to build upload-failure snapshots.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UploadContext {
    pub document_id: Uuid,
    pub document_name: String,
    pub channel_name: String,
    pub document_type_name: String,
    pub specification_name: Option<String>,
    pub related_object_id: Option<String>,
    pub related_object_type: Option<String>,
}

/// Repository for documents and their nested collections.
///
/// Updates go through the graph merge: the desired state is reconciled
/// against the persisted graph per collection, mime-type references are
/// resolved after the in-memory merge but before persistence, and the whole
/// write happens in one transaction.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a document with its nested collections. All attachments start
    /// with `storage_upload_status = false`; bytes arrive later through the
    /// upload pipeline.
    #[tracing::instrument(skip(self, input), fields(db.table = "documents", db.operation = "insert"))]
    pub async fn create(&self, input: DocumentCreate) -> Result<DocumentGraph, AppError> {
        input.validate()?;

        self.ensure_reference(
            "channels",
            input.channel_id,
            "Channel",
        )
        .await?;
        self.ensure_reference("document_types", input.document_type_id, "Document type")
            .await?;
        if let Some(spec_id) = input.specification_id {
            self.ensure_reference("document_specifications", spec_id, "Document specification")
                .await?;
        }
        self.ensure_mime_types(input.attachments.iter().map(|a| a.mime_type_id))
            .await?;
        self.ensure_categories(&input.category_ids).await?;

        let lifecycle_state = input
            .lifecycle_state
            .clone()
            .unwrap_or_else(|| "DRAFT".to_string())
            .to_uppercase();

        let mut tx = self.pool.begin().await?;

        let document = sqlx::query_as::<Postgres, Document>(&format!(
            "INSERT INTO documents (name, description, version, lifecycle_state, tags, \
             channel_id, document_type_id, specification_id, related_object_id, \
             related_object_type, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.version)
        .bind(&lifecycle_state)
        .bind(&input.tags)
        .bind(input.channel_id)
        .bind(input.document_type_id)
        .bind(input.specification_id)
        .bind(&input.related_object_id)
        .bind(&input.related_object_type)
        .bind(&input.created_by)
        .fetch_one(&mut *tx)
        .await?;

        for attachment in &input.attachments {
            insert_attachment(&mut tx, document.id, attachment).await?;
        }
        for relationship in &input.relationships {
            insert_relationship(&mut tx, document.id, relationship).await?;
        }
        for characteristic in &input.characteristics {
            insert_characteristic(&mut tx, document.id, characteristic).await?;
        }
        for party in &input.related_parties {
            insert_related_party(&mut tx, document.id, party).await?;
        }
        for category_id in &input.category_ids {
            link_category(&mut tx, document.id, *category_id).await?;
        }

        tx.commit().await?;

        self.get(document.id).await?.ok_or_else(|| {
            AppError::Internal(format!("Document {} vanished after create", document.id))
        })
    }

    /// Load a document and all of its nested collections.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<DocumentGraph>, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(document) = document else {
            return Ok(None);
        };

        let attachments = sqlx::query_as::<Postgres, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE document_id = $1 ORDER BY created_at"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let relationships = sqlx::query_as::<Postgres, DocumentRelationship>(
            "SELECT id, document_id, relationship_type, target_document_id \
             FROM document_relationships WHERE document_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let characteristics = sqlx::query_as::<Postgres, DocumentCharacteristic>(
            "SELECT id, document_id, name, value \
             FROM document_characteristics WHERE document_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let related_parties = sqlx::query_as::<Postgres, RelatedPartyRef>(
            "SELECT id, document_id, party_id, name, role \
             FROM related_party_refs WHERE document_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let categories = sqlx::query_as::<Postgres, Category>(
            "SELECT c.id, c.name, c.description FROM categories c \
             JOIN document_categories dc ON dc.category_id = c.id \
             WHERE dc.document_id = $1 ORDER BY c.name",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(DocumentGraph {
            document,
            attachments,
            relationships,
            characteristics,
            related_parties,
            categories,
        }))
    }

    /// Apply a desired-state update to the whole document graph.
    ///
    /// Removal policy per collection: relationships, characteristics and
    /// related parties absent from the desired set are deleted; category
    /// links are dissociated; attachments are never removed here (that is
    /// the deletion pipeline's job).
    #[tracing::instrument(skip(self, update), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn update(&self, id: Uuid, update: DocumentUpdate) -> Result<DocumentGraph, AppError> {
        update.validate()?;

        let graph = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

        // In-memory merge first.
        let attachment_ids: Vec<Uuid> = graph.attachments.iter().map(|a| a.id).collect();
        let relationship_ids: Vec<Uuid> = graph.relationships.iter().map(|r| r.id).collect();
        let characteristic_ids: Vec<Uuid> = graph.characteristics.iter().map(|c| c.id).collect();
        let party_ids: Vec<Uuid> = graph.related_parties.iter().map(|p| p.id).collect();
        let category_ids: Vec<Uuid> = graph.categories.iter().map(|c| c.id).collect();

        let attachment_plan = update
            .attachments
            .clone()
            .map(|desired| merge_collection(&attachment_ids, desired, RemovalPolicy::KeepMissing));
        let relationship_plan = update.relationships.clone().map(|desired| {
            merge_collection(&relationship_ids, desired, RemovalPolicy::RemoveMissing)
        });
        let characteristic_plan = update.characteristics.clone().map(|desired| {
            merge_collection(&characteristic_ids, desired, RemovalPolicy::RemoveMissing)
        });
        let party_plan = update
            .related_parties
            .clone()
            .map(|desired| merge_collection(&party_ids, desired, RemovalPolicy::RemoveMissing));
        let category_plan = update
            .category_ids
            .as_ref()
            .map(|desired| merge_id_set(&category_ids, desired));

        // Resolve every mime type the merged attachment set references before
        // touching the database, so an unresolvable id cannot leave a
        // half-applied graph behind.
        if let Some(plan) = &attachment_plan {
            self.ensure_mime_types(
                plan.updates
                    .iter()
                    .map(|(_, a)| a.mime_type_id)
                    .chain(plan.inserts.iter().map(|a| a.mime_type_id)),
            )
            .await?;
        }
        if let Some((to_link, _)) = &category_plan {
            self.ensure_categories(to_link).await?;
        }

        // Scalar fields: apply desired values over the persisted row.
        let doc = &graph.document;
        let name = update.name.clone().unwrap_or_else(|| doc.name.clone());
        let description = update.description.clone().or_else(|| doc.description.clone());
        let version = update.version.clone().or_else(|| doc.version.clone());
        let lifecycle_state = update
            .lifecycle_state
            .clone()
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| doc.lifecycle_state.clone());
        let tags = update.tags.clone().unwrap_or_else(|| doc.tags.clone());
        let specification_id = update.specification_id.or(doc.specification_id);
        let related_object_id = update
            .related_object_id
            .clone()
            .or_else(|| doc.related_object_id.clone());
        let related_object_type = update
            .related_object_type
            .clone()
            .or_else(|| doc.related_object_type.clone());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE documents SET name = $1, description = $2, version = $3, \
             lifecycle_state = $4, tags = $5, specification_id = $6, \
             related_object_id = $7, related_object_type = $8, updated_at = now() \
             WHERE id = $9",
        )
        .bind(&name)
        .bind(&description)
        .bind(&version)
        .bind(&lifecycle_state)
        .bind(&tags)
        .bind(specification_id)
        .bind(&related_object_id)
        .bind(&related_object_type)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(plan) = attachment_plan {
            for (attachment_id, input) in &plan.updates {
                update_attachment(&mut tx, *attachment_id, input).await?;
            }
            for input in &plan.inserts {
                insert_attachment(&mut tx, id, input).await?;
            }
            // plan.removals is empty by policy.
        }

        if let Some(plan) = relationship_plan {
            for (relationship_id, input) in &plan.updates {
                sqlx::query(
                    "UPDATE document_relationships \
                     SET relationship_type = $1, target_document_id = $2 WHERE id = $3",
                )
                .bind(&input.relationship_type)
                .bind(input.target_document_id)
                .bind(relationship_id)
                .execute(&mut *tx)
                .await?;
            }
            for input in &plan.inserts {
                insert_relationship(&mut tx, id, input).await?;
            }
            delete_by_ids(&mut tx, "document_relationships", &plan.removals).await?;
        }

        if let Some(plan) = characteristic_plan {
            for (characteristic_id, input) in &plan.updates {
                sqlx::query("UPDATE document_characteristics SET name = $1, value = $2 WHERE id = $3")
                    .bind(&input.name)
                    .bind(&input.value)
                    .bind(characteristic_id)
                    .execute(&mut *tx)
                    .await?;
            }
            for input in &plan.inserts {
                insert_characteristic(&mut tx, id, input).await?;
            }
            delete_by_ids(&mut tx, "document_characteristics", &plan.removals).await?;
        }

        if let Some(plan) = party_plan {
            for (party_id, input) in &plan.updates {
                sqlx::query(
                    "UPDATE related_party_refs SET party_id = $1, name = $2, role = $3 WHERE id = $4",
                )
                .bind(&input.party_id)
                .bind(&input.name)
                .bind(&input.role)
                .bind(party_id)
                .execute(&mut *tx)
                .await?;
            }
            for input in &plan.inserts {
                insert_related_party(&mut tx, id, input).await?;
            }
            delete_by_ids(&mut tx, "related_party_refs", &plan.removals).await?;
        }

        if let Some((to_link, to_unlink)) = category_plan {
            for category_id in to_link {
                link_category(&mut tx, id, category_id).await?;
            }
            if !to_unlink.is_empty() {
                sqlx::query(
                    "DELETE FROM document_categories WHERE document_id = $1 AND category_id = ANY($2)",
                )
                .bind(id)
                .bind(&to_unlink)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Document {} vanished after update", id)))
    }

    /// Delete a document and its owned rows, returning the ids of its
    /// attachments so the caller can dispatch the asynchronous blob removals.
    ///
    /// The attachments are soft-marked (`storage_upload_status = false`)
    /// before the rows are cascaded away, so the ledger write ordering of the
    /// deletion pipeline holds even if the blob removals never run.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let exists =
            sqlx::query_scalar::<Postgres, bool>("SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Document {} not found", id)));
        }

        let mut tx = self.pool.begin().await?;

        let attachment_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM attachments WHERE document_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("UPDATE attachments SET storage_upload_status = FALSE WHERE document_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // Not cascaded by the schema; removed explicitly.
        sqlx::query("DELETE FROM related_party_refs WHERE document_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(attachment_ids)
    }

    /// Criteria-based search. Fails fast on an entirely empty criteria object.
    #[tracing::instrument(skip(self, criteria), fields(db.table = "documents", db.operation = "select"))]
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Document>, AppError> {
        criteria.validate()?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT d.id, d.name, d.description, d.version, d.lifecycle_state, d.tags, \
             d.channel_id, d.document_type_id, d.specification_id, d.related_object_id, \
             d.related_object_type, d.created_by, d.created_at, d.updated_at \
             FROM documents d JOIN channels c ON c.id = d.channel_id WHERE 1=1",
        );

        if let Some(prefix) = &criteria.name_prefix {
            qb.push(" AND d.name LIKE ");
            qb.push_bind(format!("{}%", prefix));
        }
        if let Some(state) = &criteria.lifecycle_state {
            qb.push(" AND d.lifecycle_state = ");
            qb.push_bind(state.to_uppercase());
        }
        if let Some(type_id) = criteria.document_type_id {
            qb.push(" AND d.document_type_id = ");
            qb.push_bind(type_id);
        }
        if let Some(channel) = &criteria.channel_name {
            qb.push(" AND c.name = ");
            qb.push_bind(channel.clone());
        }
        if let Some(creator) = &criteria.created_by {
            qb.push(" AND d.created_by = ");
            qb.push_bind(creator.clone());
        }
        if let Some(object_id) = &criteria.related_object_id {
            qb.push(" AND d.related_object_id = ");
            qb.push_bind(object_id.clone());
        }
        if let Some(object_type) = &criteria.related_object_type {
            qb.push(" AND d.related_object_type = ");
            qb.push_bind(object_type.clone());
        }
        if let Some(after) = criteria.created_after {
            qb.push(" AND d.created_at >= ");
            qb.push_bind(after);
        }
        if let Some(before) = criteria.created_before {
            qb.push(" AND d.created_at <= ");
            qb.push_bind(before);
        }

        qb.push(" ORDER BY d.created_at DESC");

        if let Some(limit) = criteria.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
            qb.push(" OFFSET ");
            qb.push_bind(criteria.offset.unwrap_or(0));
        }

        let documents = qb
            .build_query_as::<Document>()
            .fetch_all(&self.pool)
            .await?;

        Ok(documents)
    }

    /// Denormalized document context for upload-failure snapshots.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    pub async fn get_upload_context(&self, id: Uuid) -> Result<Option<UploadContext>, AppError> {
        let context = sqlx::query_as::<Postgres, UploadContext>(
            "SELECT d.id AS document_id, d.name AS document_name, c.name AS channel_name, \
             t.name AS document_type_name, s.name AS specification_name, \
             d.related_object_id, d.related_object_type \
             FROM documents d \
             JOIN channels c ON c.id = d.channel_id \
             JOIN document_types t ON t.id = d.document_type_id \
             LEFT JOIN document_specifications s ON s.id = d.specification_id \
             WHERE d.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(context)
    }

    async fn ensure_reference(
        &self,
        table: &str,
        id: Uuid,
        label: &str,
    ) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Err(AppError::NotFound(format!("{} {} not found", label, id)));
        }
        Ok(())
    }

    async fn ensure_mime_types(
        &self,
        mime_ids: impl Iterator<Item = Uuid>,
    ) -> Result<(), AppError> {
        let wanted: Vec<Uuid> = mime_ids.collect::<HashSet<_>>().into_iter().collect();
        if wanted.is_empty() {
            return Ok(());
        }
        let found: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM supported_mime_types WHERE id = ANY($1)")
                .bind(&wanted)
                .fetch_all(&self.pool)
                .await?;
        let found: HashSet<Uuid> = found.into_iter().collect();
        if let Some(missing) = wanted.iter().find(|id| !found.contains(id)) {
            return Err(AppError::NotFound(format!(
                "Mime type {} not found",
                missing
            )));
        }
        Ok(())
    }

    async fn ensure_categories(&self, category_ids: &[Uuid]) -> Result<(), AppError> {
        if category_ids.is_empty() {
            return Ok(());
        }
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1)")
            .bind(category_ids)
            .fetch_all(&self.pool)
            .await?;
        let found: HashSet<Uuid> = found.into_iter().collect();
        if let Some(missing) = category_ids.iter().find(|id| !found.contains(id)) {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                missing
            )));
        }
        Ok(())
    }
}

async fn insert_attachment(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    input: &AttachmentInput,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO attachments (document_id, name, description, content_type, valid_from, \
         valid_to, mime_type_id, original_filename, storage_upload_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)",
    )
    .bind(document_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.content_type)
    .bind(input.valid_from)
    .bind(input.valid_to)
    .bind(input.mime_type_id)
    .bind(&input.original_filename)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_attachment(
    tx: &mut Transaction<'_, Postgres>,
    attachment_id: Uuid,
    input: &AttachmentInput,
) -> Result<(), AppError> {
    // content_type and original_filename fall back to the persisted values so
    // a metadata-only update cannot clobber what the upload pipeline wrote.
    sqlx::query(
        "UPDATE attachments SET name = $1, description = $2, \
         content_type = COALESCE($3, content_type), valid_from = $4, valid_to = $5, \
         mime_type_id = $6, original_filename = COALESCE($7, original_filename) \
         WHERE id = $8",
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.content_type)
    .bind(input.valid_from)
    .bind(input.valid_to)
    .bind(input.mime_type_id)
    .bind(&input.original_filename)
    .bind(attachment_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_relationship(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    input: &RelationshipInput,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO document_relationships (document_id, relationship_type, target_document_id) \
         VALUES ($1, $2, $3)",
    )
    .bind(document_id)
    .bind(&input.relationship_type)
    .bind(input.target_document_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_characteristic(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    input: &CharacteristicInput,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO document_characteristics (document_id, name, value) VALUES ($1, $2, $3)")
        .bind(document_id)
        .bind(&input.name)
        .bind(&input.value)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_related_party(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    input: &RelatedPartyInput,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO related_party_refs (document_id, party_id, name, role) VALUES ($1, $2, $3, $4)",
    )
    .bind(document_id)
    .bind(&input.party_id)
    .bind(&input.name)
    .bind(&input.role)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn link_category(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    category_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO document_categories (document_id, category_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(document_id)
    .bind(category_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn delete_by_ids(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    ids: &[Uuid],
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(&format!("DELETE FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
