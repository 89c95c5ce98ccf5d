//! mnemosyne library
//!
//! Embedded hybrid retrieval storage engine for semantic knowledge bases.
//! Documents are split (externally) into chunks; chunks carry embedding
//! vectors and/or text. The store persists both, keeps a vector index and
//! an inverted text index in lockstep, and answers vector, text and
//! RRF-fused hybrid queries over them.
//!
//! # Modules
//!
//! - `core`: data model, typed metadata filters, query sanitization
//! - `store`: SQLite-backed store (persistence, both indexes, queries)

pub mod core;
pub mod store;

// Re-exports for convenience
pub use crate::core::chunk::{Chunk, ChunkType, EmbeddingStatus};
pub use crate::core::document::{Document, MediaType, Metadata};
pub use crate::core::error::{Result, StoreError};
pub use crate::core::filter::{ChunkFilter, FilterValue, MetadataFilter};
pub use crate::core::sanitize::sanitize_match_query;
pub use crate::store::{ChunkHit, DocumentHit, Store, StoreStats, CANDIDATE_POOL, DEFAULT_RRF_K};
