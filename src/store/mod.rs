//! SQLite-backed hybrid retrieval store
//!
//! One handle owns one connection. Mutations span the row tables and both
//! indexes inside a single transaction; queries read the same structures.
//! The handle is single-writer: mutating calls take `&mut self`.

mod query;
mod schema;
mod vector;
mod write;

pub use query::{ChunkHit, DocumentHit, CANDIDATE_POOL, DEFAULT_RRF_K};

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::chunk::{Chunk, ChunkType, EmbeddingStatus};
use crate::core::document::{decode_metadata, Document, MediaType};
use crate::core::error::{Result, StoreError};
use self::vector::blob_to_embedding;

const DIMENSION_KEY: &str = "embedding_dimension";

/// Store handle with an explicit open/close lifecycle.
///
/// The embedding dimension is fixed at store creation and recorded in the
/// catalog; every subsequent open must request the same dimension.
pub struct Store {
    conn: Connection,
    dimension: usize,
}

impl Store {
    /// Open or create a store at `path`.
    ///
    /// Safe to call repeatedly. Every open reconciles the inverted text
    /// index against the chunk table (crash/upgrade recovery).
    pub fn open(path: &Path, dimension: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, dimension)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, dimension)
    }

    fn from_connection(mut conn: Connection, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(StoreError::Validation(
                "embedding dimension must be non-zero".to_string(),
            ));
        }

        conn.pragma_update(None, "foreign_keys", 1)?;
        schema::init_schema(&conn)?;

        match get_meta(&conn, DIMENSION_KEY)? {
            Some(raw) => {
                let recorded: usize = raw.parse().map_err(|_| {
                    StoreError::Consistency(format!(
                        "corrupt embedding dimension record: {raw:?}"
                    ))
                })?;
                if recorded != dimension {
                    return Err(StoreError::Validation(format!(
                        "store was created with dimension {recorded}, requested {dimension}"
                    )));
                }
            }
            None => set_meta(&conn, DIMENSION_KEY, &dimension.to_string())?,
        }

        schema::reconcile_text_index(&mut conn)?;

        Ok(Self { conn, dimension })
    }

    /// The fixed embedding dimension `D` of this store.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub(crate) fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(StoreError::Validation(format!(
                "embedding has length {}, store dimension is {}",
                embedding.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    /// Fetch a document by id.
    pub fn get_document(&self, id: i64) -> Result<Option<Document>> {
        self.conn
            .query_row(
                "SELECT id, content, metadata, media_type, created_at
                 FROM documents WHERE id = ?1",
                params![id],
                document_from_row,
            )
            .optional()
            .map_err(StoreError::from)
    }

    /// Fetch a chunk by id, with its stored embedding when one is indexed.
    pub fn get_chunk(&self, id: i64) -> Result<Option<Chunk>> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS}, v.embedding
             FROM chunks c LEFT JOIN chunk_vectors v ON v.chunk_id = c.id
             WHERE c.id = ?1"
        );
        self.conn
            .query_row(&sql, params![id], chunk_with_embedding_from_row)
            .optional()
            .map_err(StoreError::from)
    }

    /// All chunks of a document, ordered by chunk index.
    pub fn document_chunks(&self, document_id: i64) -> Result<Vec<Chunk>> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS}, v.embedding
             FROM chunks c LEFT JOIN chunk_vectors v ON v.chunk_id = c.id
             WHERE c.doc_id = ?1
             ORDER BY c.chunk_index ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![document_id], chunk_with_embedding_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Get store statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            document_count: self.count("SELECT COUNT(*) FROM documents")?,
            chunk_count: self.count("SELECT COUNT(*) FROM chunks")?,
            vector_count: self.count("SELECT COUNT(*) FROM chunk_vectors")?,
            pending_count: self.count_status(EmbeddingStatus::Pending)?,
            failed_count: self.count_status(EmbeddingStatus::Failed)?,
        })
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn count_status(&self, status: EmbeddingStatus) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE embedding_status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub vector_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO store_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM store_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(StoreError::from)
}

/// Chunk column list shared by every query that decodes chunk rows.
/// Order matches `chunk_from_row`.
pub(crate) const CHUNK_COLUMNS: &str = "c.id, c.doc_id, c.chunk_index, c.content, c.chunk_type, c.language, c.embedding_status, c.batch_job_id, c.error_message, c.metadata, c.created_at";

pub(crate) fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let chunk_type_raw: String = row.get(4)?;
    let status_raw: String = row.get(6)?;
    let metadata_json: String = row.get(9)?;
    Ok(Chunk {
        id: Some(row.get(0)?),
        doc_id: Some(row.get(1)?),
        chunk_index: row.get(2)?,
        content: row.get(3)?,
        chunk_type: ChunkType::parse(&chunk_type_raw).map_err(|e| conversion_error(4, e))?,
        language: row.get(5)?,
        embedding_status: EmbeddingStatus::parse(&status_raw)
            .map_err(|e| conversion_error(6, e))?,
        batch_job_id: row.get(7)?,
        error_message: row.get(8)?,
        metadata: decode_metadata(&metadata_json).map_err(|e| conversion_error(9, e))?,
        created_at: row.get(10)?,
        embedding: None,
    })
}

/// `chunk_from_row` plus an embedding BLOB (possibly NULL) at column 11.
pub(crate) fn chunk_with_embedding_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let mut chunk = chunk_from_row(row)?;
    let blob: Option<Vec<u8>> = row.get(11)?;
    chunk.embedding = blob.as_deref().map(blob_to_embedding);
    Ok(chunk)
}

pub(crate) fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    let metadata_json: String = row.get(2)?;
    let media_raw: String = row.get(3)?;
    Ok(Document {
        id: Some(row.get(0)?),
        content: row.get(1)?,
        metadata: decode_metadata(&metadata_json).map_err(|e| conversion_error(2, e))?,
        media_type: MediaType::parse(&media_raw).map_err(|e| conversion_error(3, e))?,
        created_at: row.get(4)?,
    })
}

fn conversion_error(index: usize, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::Chunk;
    use crate::core::document::Document;

    #[test]
    fn test_open_in_memory() -> anyhow::Result<()> {
        let store = Store::open_in_memory(4)?;
        assert_eq!(store.dimension(), 4);
        assert_eq!(store.stats()?.document_count, 0);
        Ok(())
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            Store::open_in_memory(0),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_ids_read_as_none() -> anyhow::Result<()> {
        let store = Store::open_in_memory(4)?;
        assert!(store.get_document(42)?.is_none());
        assert!(store.get_chunk(42)?.is_none());
        assert!(store.document_chunks(42)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_reopen_requires_same_dimension() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.db");

        {
            let mut store = Store::open(&path, 4)?;
            let mut doc = Document::new("doc", MediaType::Text);
            let mut chunks = vec![Chunk::new(0, "alpha", ChunkType::Text)];
            store.save(&mut doc, &mut chunks)?;
        }

        // Same dimension reopens cleanly.
        let store = Store::open(&path, 4)?;
        assert_eq!(store.stats()?.chunk_count, 1);
        drop(store);

        // A different dimension is contradictory input.
        assert!(matches!(
            Store::open(&path, 8),
            Err(StoreError::Validation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_reopen_backfills_dropped_text_index() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.db");

        {
            let mut store = Store::open(&path, 4)?;
            let mut doc = Document::new("doc", MediaType::Text);
            let mut chunks = vec![Chunk::new(0, "alpha beta", ChunkType::Text)];
            store.save(&mut doc, &mut chunks)?;
        }

        // Simulate a database from before the text index existed.
        {
            let conn = Connection::open(&path)?;
            conn.execute_batch("DROP TABLE chunk_fts")?;
        }

        let store = Store::open(&path, 4)?;
        let hits = store.text_search_chunks("alpha", &crate::core::filter::ChunkFilter::new(), 5)?;
        assert_eq!(hits.len(), 1);
        Ok(())
    }
}
