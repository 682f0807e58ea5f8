use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Document lifecycle state. Stored as TEXT; parsed on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    Draft,
    Active,
    Archived,
    Deprecated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Draft => "DRAFT",
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Archived => "ARCHIVED",
            LifecycleState::Deprecated => "DEPRECATED",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(LifecycleState::Draft),
            "ACTIVE" => Ok(LifecycleState::Active),
            "ARCHIVED" => Ok(LifecycleState::Archived),
            "DEPRECATED" => Ok(LifecycleState::Deprecated),
            other => Err(format!("Unknown lifecycle state: {}", other)),
        }
    }
}

/// Document metadata record.
///
/// A document always has a channel and a document type; the specification and
/// the related-object reference are optional. Nested collections live in
/// [`DocumentGraph`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub lifecycle_state: String,
    pub tags: Vec<String>,
    pub channel_id: Uuid,
    pub document_type_id: Uuid,
    pub specification_id: Option<Uuid>,
    pub related_object_id: Option<String>,
    pub related_object_type: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A document with its nested collections loaded.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentGraph {
    #[serde(flatten)]
    pub document: Document,
    pub attachments: Vec<super::Attachment>,
    pub relationships: Vec<DocumentRelationship>,
    pub characteristics: Vec<DocumentCharacteristic>,
    pub related_parties: Vec<RelatedPartyRef>,
    pub categories: Vec<super::Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentRelationship {
    pub id: Uuid,
    pub document_id: Uuid,
    pub relationship_type: String,
    pub target_document_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentCharacteristic {
    pub id: Uuid,
    pub document_id: Uuid,
    pub name: String,
    pub value: String,
}

/// Reference to a party (customer, organization) related to a document.
/// Not cascade-deleted by the database; the merge manages these rows itself.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RelatedPartyRef {
    pub id: Uuid,
    pub document_id: Uuid,
    pub party_id: Option<String>,
    pub name: String,
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_state_roundtrip() {
        for s in ["DRAFT", "ACTIVE", "ARCHIVED", "DEPRECATED"] {
            assert_eq!(s.parse::<LifecycleState>().unwrap().as_str(), s);
        }
        assert!("draft".parse::<LifecycleState>().is_ok());
        assert!("UNKNOWN".parse::<LifecycleState>().is_err());
    }
}
