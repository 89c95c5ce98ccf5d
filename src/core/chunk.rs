//! Chunks - the atomic indexed unit of a document's content

use serde::{Deserialize, Serialize};

use super::document::Metadata;
use super::error::{Result, StoreError};

/// Content class of a chunk, used for filter pushdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Text,
    Code,
    Table,
    ImageRef,
    AudioRef,
    VideoRef,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Table => "table",
            Self::ImageRef => "image_ref",
            Self::AudioRef => "audio_ref",
            Self::VideoRef => "video_ref",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "text" => Ok(Self::Text),
            "code" => Ok(Self::Code),
            "table" => Ok(Self::Table),
            "image_ref" => Ok(Self::ImageRef),
            "audio_ref" => Ok(Self::AudioRef),
            "video_ref" => Ok(Self::VideoRef),
            _ => Err(StoreError::Consistency(format!(
                "unknown chunk_type: {value}"
            ))),
        }
    }
}

/// Embedding lifecycle tag.
///
/// `Ready` iff a vector of the store's dimension is present in the vector
/// index for this chunk; `Pending` and `Failed` chunks are never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    Pending,
    Ready,
    Failed,
}

impl EmbeddingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            _ => Err(StoreError::Consistency(format!(
                "unknown embedding_status: {value}"
            ))),
        }
    }
}

/// A chunk of a document's content, carrying at most one embedding.
///
/// `chunk_index` is assigned by the external splitter and never recomputed
/// here; it is unique within the parent document but gaps are legal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Assigned on save; `None` before the chunk is persisted.
    pub id: Option<i64>,
    /// Parent document id, assigned on save.
    pub doc_id: Option<i64>,
    pub chunk_index: u32,
    pub content: String,
    pub chunk_type: ChunkType,
    pub language: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub embedding_status: EmbeddingStatus,
    pub batch_job_id: Option<String>,
    pub error_message: Option<String>,
    pub metadata: Metadata,
    /// Epoch seconds, stamped on save.
    pub created_at: i64,
}

impl Chunk {
    pub fn new(chunk_index: u32, content: impl Into<String>, chunk_type: ChunkType) -> Self {
        Self {
            id: None,
            doc_id: None,
            chunk_index,
            content: content.into(),
            chunk_type,
            language: None,
            embedding: None,
            embedding_status: EmbeddingStatus::Pending,
            batch_job_id: None,
            error_message: None,
            metadata: Metadata::new(),
            created_at: 0,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}
