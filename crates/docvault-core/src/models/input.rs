//! Request-side representations: document create/update payloads and the
//! criteria search object.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::merge::HasId;
use crate::models::LifecycleState;

/// Desired-state attachment element. Size, URL and upload status are owned by
/// the upload pipeline and cannot be set by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentInput {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub mime_type_id: Uuid,
    pub original_filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipInput {
    pub id: Option<Uuid>,
    pub relationship_type: String,
    pub target_document_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacteristicInput {
    pub id: Option<Uuid>,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedPartyInput {
    pub id: Option<Uuid>,
    pub party_id: Option<String>,
    pub name: String,
    pub role: Option<String>,
}

impl HasId for AttachmentInput {
    fn id(&self) -> Option<Uuid> {
        self.id
    }
}

impl HasId for RelationshipInput {
    fn id(&self) -> Option<Uuid> {
        self.id
    }
}

impl HasId for CharacteristicInput {
    fn id(&self) -> Option<Uuid> {
        self.id
    }
}

impl HasId for RelatedPartyInput {
    fn id(&self) -> Option<Uuid> {
        self.id
    }
}

/// Payload for `POST /document`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentCreate {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub lifecycle_state: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub channel_id: Uuid,
    pub document_type_id: Uuid,
    pub specification_id: Option<Uuid>,
    pub related_object_id: Option<String>,
    pub related_object_type: Option<String>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
    #[serde(default)]
    pub relationships: Vec<RelationshipInput>,
    #[serde(default)]
    pub characteristics: Vec<CharacteristicInput>,
    #[serde(default)]
    pub related_parties: Vec<RelatedPartyInput>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

impl DocumentCreate {
    /// Fail before any store mutation if a required field is missing or malformed.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Document name must not be empty".to_string(),
            ));
        }
        if let Some(state) = &self.lifecycle_state {
            state
                .parse::<LifecycleState>()
                .map_err(AppError::InvalidInput)?;
        }
        Ok(())
    }
}

/// Payload for `PUT /document/{id}`: the desired state of the whole graph.
///
/// Scalar fields are applied as-is; each nested collection is reconciled by
/// the graph merge. A collection left out of the payload (`None`) is not
/// merged at all, which is distinct from an explicitly empty list.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub lifecycle_state: Option<String>,
    pub tags: Option<Vec<String>>,
    pub specification_id: Option<Uuid>,
    pub related_object_id: Option<String>,
    pub related_object_type: Option<String>,
    pub attachments: Option<Vec<AttachmentInput>>,
    pub relationships: Option<Vec<RelationshipInput>>,
    pub characteristics: Option<Vec<CharacteristicInput>>,
    pub related_parties: Option<Vec<RelatedPartyInput>>,
    pub category_ids: Option<Vec<Uuid>>,
}

impl DocumentUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::InvalidInput(
                    "Document name must not be empty".to_string(),
                ));
            }
        }
        if let Some(state) = &self.lifecycle_state {
            state
                .parse::<LifecycleState>()
                .map_err(AppError::InvalidInput)?;
        }
        Ok(())
    }
}

/// Criteria-based document search. A criteria object with no filters at all
/// fails fast instead of scanning the whole table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchCriteria {
    pub name_prefix: Option<String>,
    pub lifecycle_state: Option<String>,
    pub document_type_id: Option<Uuid>,
    pub channel_name: Option<String>,
    pub created_by: Option<String>,
    pub related_object_id: Option<String>,
    pub related_object_type: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    // Paging; absent means unpaged full list.
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchCriteria {
    /// True when every filter field is unset (paging fields do not count).
    pub fn is_empty(&self) -> bool {
        self.name_prefix.is_none()
            && self.lifecycle_state.is_none()
            && self.document_type_id.is_none()
            && self.channel_name.is_none()
            && self.created_by.is_none()
            && self.related_object_id.is_none()
            && self.related_object_type.is_none()
            && self.created_after.is_none()
            && self.created_before.is_none()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one search criterion is required".to_string(),
            ));
        }
        if let Some(state) = &self.lifecycle_state {
            state
                .parse::<LifecycleState>()
                .map_err(AppError::InvalidInput)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_name() {
        let create = DocumentCreate {
            name: "  ".to_string(),
            description: None,
            version: None,
            lifecycle_state: None,
            tags: vec![],
            channel_id: Uuid::new_v4(),
            document_type_id: Uuid::new_v4(),
            specification_id: None,
            related_object_id: None,
            related_object_type: None,
            created_by: None,
            attachments: vec![],
            relationships: vec![],
            characteristics: vec![],
            related_parties: vec![],
            category_ids: vec![],
        };
        assert!(create.validate().is_err());
    }

    #[test]
    fn test_empty_criteria_fails_fast() {
        let criteria = SearchCriteria::default();
        assert!(criteria.is_empty());
        assert!(criteria.validate().is_err());

        let criteria = SearchCriteria {
            name_prefix: Some("contract".to_string()),
            ..Default::default()
        };
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_paging_fields_do_not_count_as_criteria() {
        let criteria = SearchCriteria {
            offset: Some(0),
            limit: Some(20),
            ..Default::default()
        };
        assert!(criteria.validate().is_err());
    }
}
