use serde::{Deserialize, Serialize};

use crate::error::{HamftsError, Result};
use crate::models::{Document, DocumentMetadata};

/// Search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Request to add a document
///
/// ```json
/// { "id": "1", "content": "The quick brown fox", "metadata": { "category": "animals" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub id: String,
    pub content: String,
    /// Must be a JSON object when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl DocumentRequest {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validate the request and stamp it into a new document
    pub fn into_document(self) -> Result<Document> {
        if self.id.trim().is_empty() {
            return Err(HamftsError::InvalidQuery(
                "document id must not be empty".to_string(),
            ));
        }
        let metadata = parse_metadata(self.metadata)?;
        Ok(Document::new(self.id, self.content).with_metadata(metadata))
    }
}

/// Accept a JSON object (or nothing) as document metadata
pub fn parse_metadata(value: Option<serde_json::Value>) -> Result<DocumentMetadata> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(DocumentMetadata::new()),
        Some(serde_json::Value::Object(map)) => Ok(map.into_iter().collect()),
        Some(other) => Err(HamftsError::InvalidQuery(format!(
            "metadata must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Response after adding documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddResponse {
    pub added: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// API Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
