//! Domain models shared across docvault components.

mod attachment;
mod audit;
mod document;
mod input;
mod reference;

pub use attachment::Attachment;
pub use audit::{DeletionAuditEntry, StorageUploadAudit, UploadFailureSnapshot};
pub use document::{
    Document, DocumentCharacteristic, DocumentGraph, DocumentRelationship, LifecycleState,
    RelatedPartyRef,
};
pub use input::{
    AttachmentInput, CharacteristicInput, DocumentCreate, DocumentUpdate, RelatedPartyInput,
    RelationshipInput, SearchCriteria,
};
pub use reference::{Category, Channel, DocumentSpecification, DocumentType, SupportedMimeType};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::S3 => "s3",
            StorageBackend::Local => "local",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}
