//! Core data model for the hybrid retrieval store
//!
//! Documents, chunks and their lifecycle enums, plus the storage-free
//! pieces of the query path: typed metadata filters and MATCH-query
//! sanitization.

pub mod chunk;
pub mod document;
pub mod error;
pub mod filter;
pub mod sanitize;

pub use chunk::{Chunk, ChunkType, EmbeddingStatus};
pub use document::{Document, MediaType, Metadata};
pub use error::{Result, StoreError};
pub use filter::{ChunkFilter, FilterValue, MetadataFilter};
pub use sanitize::sanitize_match_query;
