use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique document identifier
pub type DocumentId = String;

/// Caller-supplied document attributes
pub type DocumentMetadata = HashMap<String, serde_json::Value>;

/// Stored document. Immutable once written; replacement is delete + re-add.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document stamped with the current time and no metadata
    pub fn new(id: impl Into<DocumentId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at: Utc::now(),
            metadata: DocumentMetadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Insert a single metadata attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
