//! Documents - the unit of ingestion

use serde::{Deserialize, Serialize};

use super::error::{Result, StoreError};

/// Free-form metadata attached to documents and chunks.
///
/// JSON-shaped: scalar or list values under string keys.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Media class of a document's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Text,
    Image,
    Video,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            _ => Err(StoreError::Consistency(format!(
                "unknown media_type: {value}"
            ))),
        }
    }
}

/// A stored document. Chunks carry the indexed content; the document row
/// holds the original text and its free-form metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Assigned on save; `None` before the document is persisted.
    pub id: Option<i64>,
    pub content: String,
    pub metadata: Metadata,
    pub media_type: MediaType,
    /// Epoch seconds, stamped on save.
    pub created_at: i64,
}

impl Document {
    pub fn new(content: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: Metadata::new(),
            media_type,
            created_at: 0,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Encode metadata to its JSON TEXT column form.
pub(crate) fn encode_metadata(metadata: &Metadata) -> Result<String> {
    serde_json::to_string(metadata)
        .map_err(|e| StoreError::Validation(format!("metadata is not serializable: {e}")))
}

/// Decode a metadata column back into a map.
pub(crate) fn decode_metadata(raw: &str) -> Result<Metadata> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::Consistency(format!("corrupt metadata record: {e}")))
}
