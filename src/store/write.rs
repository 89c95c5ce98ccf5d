//! Persistence API: the only write path.
//!
//! Every operation here is one transaction spanning the row tables, the
//! vector index and the inverted text index. The text index is maintained
//! by the `on_chunk_write`/`on_chunk_delete` hooks called inside the same
//! transaction as the row writes.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rusqlite::{params, params_from_iter, Transaction};
use tracing::debug;

use crate::core::chunk::{Chunk, EmbeddingStatus};
use crate::core::document::{encode_metadata, Document};
use crate::core::error::{Result, StoreError};
use crate::core::filter::MetadataFilter;

use super::vector::embedding_to_blob;
use super::{chunk_from_row, Store, CHUNK_COLUMNS};

impl Store {
    /// Persist a document together with its chunks.
    ///
    /// One transaction: on any failure nothing commits. A chunk carrying an
    /// embedding is written into the vector index as `Ready`; a chunk
    /// without one is written `Pending`. On success the document and chunks
    /// are given their assigned ids in place; returns the document id.
    pub fn save(&mut self, document: &mut Document, chunks: &mut [Chunk]) -> Result<i64> {
        if chunks.is_empty() {
            return Err(StoreError::Validation(
                "a document must be saved with at least one chunk".to_string(),
            ));
        }

        let mut seen_indexes = HashSet::new();
        for chunk in chunks.iter() {
            if !seen_indexes.insert(chunk.chunk_index) {
                return Err(StoreError::Validation(format!(
                    "duplicate chunk_index {} within one document",
                    chunk.chunk_index
                )));
            }
            if let Some(embedding) = &chunk.embedding {
                self.check_dimension(embedding)?;
            }
        }

        let document_metadata = encode_metadata(&document.metadata)?;
        let chunk_metadata = chunks
            .iter()
            .map(|chunk| encode_metadata(&chunk.metadata))
            .collect::<Result<Vec<_>>>()?;

        let now = Utc::now().timestamp();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO documents (content, metadata, media_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                document.content,
                document_metadata,
                document.media_type.as_str(),
                now
            ],
        )?;
        let doc_id = tx.last_insert_rowid();

        let mut assigned = Vec::with_capacity(chunks.len());
        {
            let mut chunk_stmt = tx.prepare(
                "INSERT INTO chunks (doc_id, chunk_index, content, chunk_type, language,
                                     embedding_status, batch_job_id, error_message, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (chunk, metadata_json) in chunks.iter().zip(&chunk_metadata) {
                let status = if chunk.embedding.is_some() {
                    EmbeddingStatus::Ready
                } else {
                    EmbeddingStatus::Pending
                };
                chunk_stmt.execute(params![
                    doc_id,
                    chunk.chunk_index,
                    chunk.content,
                    chunk.chunk_type.as_str(),
                    chunk.language,
                    status.as_str(),
                    chunk.batch_job_id,
                    chunk.error_message,
                    metadata_json,
                    now
                ])?;
                let chunk_id = tx.last_insert_rowid();

                on_chunk_write(&tx, chunk_id, &chunk.content)?;
                if let Some(embedding) = &chunk.embedding {
                    tx.execute(
                        "INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?1, ?2)",
                        params![chunk_id, embedding_to_blob(embedding)],
                    )?;
                }

                assigned.push((chunk_id, status));
            }
        }
        tx.commit()?;

        document.id = Some(doc_id);
        document.created_at = now;
        for (chunk, (chunk_id, status)) in chunks.iter_mut().zip(assigned) {
            chunk.id = Some(chunk_id);
            chunk.doc_id = Some(doc_id);
            chunk.embedding_status = status;
            chunk.created_at = now;
        }

        debug!(doc_id, chunks = chunks.len(), "document saved");
        Ok(doc_id)
    }

    /// Delete a document, cascading over its chunks and their index
    /// entries. Returns the number of chunk rows removed.
    pub fn delete(&mut self, document_id: i64) -> Result<usize> {
        let tx = self.conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1)",
            params![document_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::NotFound(format!("document {document_id}")));
        }

        let chunk_ids = chunk_ids_for_document(&tx, document_id)?;
        for chunk_id in &chunk_ids {
            on_chunk_delete(&tx, *chunk_id)?;
        }
        tx.execute("DELETE FROM chunks WHERE doc_id = ?1", params![document_id])?;
        tx.execute("DELETE FROM documents WHERE id = ?1", params![document_id])?;
        tx.commit()?;

        debug!(document_id, chunks = chunk_ids.len(), "document deleted");
        Ok(chunk_ids.len())
    }

    /// Delete every chunk whose metadata matches the filter (conjunction of
    /// exact-match predicates), plus its index entries. Parent documents are
    /// left in place. Returns 0 when nothing matches.
    pub fn delete_by_metadata(&mut self, filter: &MetadataFilter) -> Result<usize> {
        if filter.is_empty() {
            return Err(StoreError::Validation(
                "empty metadata filter would match every chunk".to_string(),
            ));
        }
        filter.validate()?;

        let (where_sql, where_params) = filter.compile("metadata");
        let tx = self.conn.transaction()?;

        let chunk_ids: Vec<i64> = {
            let sql = format!("SELECT id FROM chunks WHERE {where_sql}");
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(where_params), |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        {
            let mut delete_stmt = tx.prepare("DELETE FROM chunks WHERE id = ?1")?;
            for chunk_id in &chunk_ids {
                on_chunk_delete(&tx, *chunk_id)?;
                delete_stmt.execute(params![chunk_id])?;
            }
        }
        tx.commit()?;

        debug!(chunks = chunk_ids.len(), "chunks deleted by metadata");
        Ok(chunk_ids.len())
    }

    /// Write many vectors in one transaction through a single batched
    /// statement, then flip every touched chunk to `Ready`, clearing its
    /// batch job id and error message.
    ///
    /// An unknown chunk id rolls the whole batch back with `NotFound`;
    /// there are never partial writes.
    pub fn bulk_update_vectors(&mut self, vectors: &HashMap<i64, Vec<f32>>) -> Result<usize> {
        if vectors.is_empty() {
            return Err(StoreError::Validation(
                "no vectors to write".to_string(),
            ));
        }
        for (chunk_id, embedding) in vectors {
            self.check_dimension(embedding).map_err(|_| {
                StoreError::Validation(format!(
                    "embedding for chunk {chunk_id} has length {}, store dimension is {}",
                    embedding.len(),
                    self.dimension()
                ))
            })?;
        }

        let tx = self.conn.transaction()?;
        {
            let mut vector_stmt = tx.prepare(
                "INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?1, ?2)
                 ON CONFLICT(chunk_id) DO UPDATE SET embedding = excluded.embedding",
            )?;
            let mut status_stmt = tx.prepare(
                "UPDATE chunks
                 SET embedding_status = ?2, batch_job_id = NULL, error_message = NULL
                 WHERE id = ?1",
            )?;
            for (chunk_id, embedding) in vectors {
                let updated =
                    status_stmt.execute(params![chunk_id, EmbeddingStatus::Ready.as_str()])?;
                if updated == 0 {
                    return Err(StoreError::NotFound(format!("chunk {chunk_id}")));
                }
                vector_stmt.execute(params![chunk_id, embedding_to_blob(embedding)])?;
            }
        }
        tx.commit()?;

        debug!(count = vectors.len(), "bulk vector update committed");
        Ok(vectors.len())
    }

    /// Record the external batch job id on pending chunks. Chunks that are
    /// not pending are skipped; returns the number of chunks tagged.
    pub fn assign_batch_job(&mut self, chunk_ids: &[i64], job_id: &str) -> Result<usize> {
        if chunk_ids.is_empty() {
            return Err(StoreError::Validation("no chunk ids given".to_string()));
        }
        if job_id.is_empty() {
            return Err(StoreError::Validation("batch job id is empty".to_string()));
        }

        let tx = self.conn.transaction()?;
        let mut tagged = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE chunks SET batch_job_id = ?2
                 WHERE id = ?1 AND embedding_status = ?3",
            )?;
            for chunk_id in chunk_ids {
                tagged +=
                    stmt.execute(params![chunk_id, job_id, EmbeddingStatus::Pending.as_str()])?;
            }
        }
        tx.commit()?;

        debug!(job_id, tagged, "batch job assigned");
        Ok(tagged)
    }

    /// Accept an external failure report for pending chunks: status becomes
    /// `Failed`, the error message is recorded, the batch job id cleared.
    /// Never touches the vector index.
    pub fn mark_embeddings_failed(&mut self, chunk_ids: &[i64], error: &str) -> Result<usize> {
        if chunk_ids.is_empty() {
            return Err(StoreError::Validation("no chunk ids given".to_string()));
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE chunks
                 SET embedding_status = ?2, error_message = ?3, batch_job_id = NULL
                 WHERE id = ?1 AND embedding_status = ?4",
            )?;
            for chunk_id in chunk_ids {
                let updated = stmt.execute(params![
                    chunk_id,
                    EmbeddingStatus::Failed.as_str(),
                    error,
                    EmbeddingStatus::Pending.as_str()
                ])?;
                if updated == 0 {
                    let exists: i64 = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM chunks WHERE id = ?1)",
                        params![chunk_id],
                        |row| row.get(0),
                    )?;
                    return Err(if exists == 0 {
                        StoreError::NotFound(format!("chunk {chunk_id}"))
                    } else {
                        StoreError::Validation(format!(
                            "chunk {chunk_id} is not pending an embedding"
                        ))
                    });
                }
            }
        }
        tx.commit()?;

        debug!(count = chunk_ids.len(), "embeddings marked failed");
        Ok(chunk_ids.len())
    }

    /// Chunks awaiting an embedding, oldest first, for the external batch
    /// scheduler to drain.
    pub fn pending_chunks(&self, limit: usize) -> Result<Vec<Chunk>> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks c
             WHERE c.embedding_status = ?1
             ORDER BY c.created_at ASC, c.id ASC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![EmbeddingStatus::Pending.as_str(), limit as i64],
            chunk_from_row,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }
}

/// Text index write hook, called inside the chunk's own transaction.
fn on_chunk_write(tx: &Transaction<'_>, chunk_id: i64, content: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO chunk_fts(rowid, content) VALUES (?1, ?2)",
        params![chunk_id, content],
    )?;
    Ok(())
}

/// Index delete hook: drops the chunk's text and vector entries.
fn on_chunk_delete(tx: &Transaction<'_>, chunk_id: i64) -> Result<()> {
    tx.execute("DELETE FROM chunk_fts WHERE rowid = ?1", params![chunk_id])?;
    tx.execute(
        "DELETE FROM chunk_vectors WHERE chunk_id = ?1",
        params![chunk_id],
    )?;
    Ok(())
}

fn chunk_ids_for_document(tx: &Transaction<'_>, document_id: i64) -> Result<Vec<i64>> {
    let mut stmt = tx.prepare("SELECT id FROM chunks WHERE doc_id = ?1")?;
    let rows = stmt.query_map(params![document_id], |row| row.get(0))?;
    rows.collect::<rusqlite::Result<_>>().map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::ChunkType;
    use crate::core::document::{Document, MediaType, Metadata};
    use serde_json::json;

    fn store() -> Store {
        Store::open_in_memory(4).unwrap()
    }

    fn tagged(key: &str, value: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(key.to_string(), json!(value));
        metadata
    }

    #[test]
    fn test_save_assigns_ids_and_statuses() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(0, "alpha", ChunkType::Text).with_embedding(vec![1.0, 0.0, 0.0, 0.0]),
            Chunk::new(1, "beta", ChunkType::Text),
        ];

        let doc_id = store.save(&mut doc, &mut chunks)?;

        assert_eq!(doc.id, Some(doc_id));
        assert!(doc.created_at > 0);
        assert_eq!(chunks[0].doc_id, Some(doc_id));
        assert_eq!(chunks[0].embedding_status, EmbeddingStatus::Ready);
        assert_eq!(chunks[1].embedding_status, EmbeddingStatus::Pending);
        assert!(chunks[0].id.is_some() && chunks[1].id.is_some());

        let stats = store.stats()?;
        assert_eq!(stats.document_count, 1);
        assert_eq!(stats.chunk_count, 2);
        assert_eq!(stats.vector_count, 1);
        assert_eq!(stats.pending_count, 1);
        Ok(())
    }

    #[test]
    fn test_save_requires_chunks() {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        assert!(matches!(
            store.save(&mut doc, &mut []),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_save_rejects_duplicate_chunk_index() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(3, "alpha", ChunkType::Text),
            Chunk::new(3, "beta", ChunkType::Text),
        ];

        assert!(matches!(
            store.save(&mut doc, &mut chunks),
            Err(StoreError::Validation(_))
        ));

        // Nothing persisted.
        let stats = store.stats()?;
        assert_eq!(stats.document_count, 0);
        assert_eq!(stats.chunk_count, 0);
        assert!(doc.id.is_none());
        Ok(())
    }

    #[test]
    fn test_save_rejects_wrong_dimension() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![Chunk::new(0, "alpha", ChunkType::Text).with_embedding(vec![1.0])];

        assert!(matches!(
            store.save(&mut doc, &mut chunks),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.stats()?.document_count, 0);
        Ok(())
    }

    #[test]
    fn test_chunk_index_gaps_are_legal() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(0, "alpha", ChunkType::Text),
            Chunk::new(5, "beta", ChunkType::Text),
        ];
        store.save(&mut doc, &mut chunks)?;
        assert_eq!(store.stats()?.chunk_count, 2);
        Ok(())
    }

    #[test]
    fn test_delete_cascades_rows_and_indexes() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(0, "alpha", ChunkType::Text).with_embedding(vec![1.0, 0.0, 0.0, 0.0]),
            Chunk::new(1, "beta", ChunkType::Text),
        ];
        let doc_id = store.save(&mut doc, &mut chunks)?;

        let removed = store.delete(doc_id)?;
        assert_eq!(removed, 2);

        let stats = store.stats()?;
        assert_eq!(stats.document_count, 0);
        assert_eq!(stats.chunk_count, 0);
        assert_eq!(stats.vector_count, 0);
        assert!(store.get_document(doc_id)?.is_none());

        // Text index entries are gone too.
        let hits =
            store.text_search_chunks("alpha", &crate::core::filter::ChunkFilter::new(), 5)?;
        assert!(hits.is_empty());
        Ok(())
    }

    #[test]
    fn test_delete_unknown_document() {
        let mut store = store();
        assert!(matches!(
            store.delete(99),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_by_metadata_removes_only_matches() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(0, "alpha", ChunkType::Text),
            Chunk::new(1, "beta", ChunkType::Text).with_metadata(tagged("tag", "x")),
        ];
        let doc_id = store.save(&mut doc, &mut chunks)?;

        let removed = store.delete_by_metadata(&MetadataFilter::new().eq("tag", "x"))?;
        assert_eq!(removed, 1);

        // c0 and the parent document remain.
        assert!(store.get_document(doc_id)?.is_some());
        let remaining = store.document_chunks(doc_id)?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "alpha");
        Ok(())
    }

    #[test]
    fn test_delete_by_metadata_no_match_returns_zero() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![Chunk::new(0, "alpha", ChunkType::Text)];
        store.save(&mut doc, &mut chunks)?;

        let removed = store.delete_by_metadata(&MetadataFilter::new().eq("tag", "missing"))?;
        assert_eq!(removed, 0);
        assert_eq!(store.stats()?.chunk_count, 1);
        Ok(())
    }

    #[test]
    fn test_delete_by_metadata_rejects_empty_filter() {
        let mut store = store();
        assert!(matches!(
            store.delete_by_metadata(&MetadataFilter::new()),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_bulk_update_vectors_flips_status() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(0, "alpha", ChunkType::Text),
            Chunk::new(1, "beta", ChunkType::Text),
        ];
        store.save(&mut doc, &mut chunks)?;
        let ids: Vec<i64> = chunks.iter().map(|c| c.id.unwrap()).collect();
        store.assign_batch_job(&ids, "job-1")?;

        let mut vectors = HashMap::new();
        vectors.insert(ids[0], vec![1.0, 0.0, 0.0, 0.0]);
        vectors.insert(ids[1], vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(store.bulk_update_vectors(&vectors)?, 2);

        for id in &ids {
            let chunk = store.get_chunk(*id)?.unwrap();
            assert_eq!(chunk.embedding_status, EmbeddingStatus::Ready);
            assert!(chunk.batch_job_id.is_none());
            assert!(chunk.error_message.is_none());
            assert!(chunk.embedding.is_some());
        }
        assert_eq!(store.stats()?.vector_count, 2);
        Ok(())
    }

    #[test]
    fn test_bulk_update_vectors_rejects_empty_map() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![Chunk::new(0, "alpha", ChunkType::Text)];
        store.save(&mut doc, &mut chunks)?;

        assert!(matches!(
            store.bulk_update_vectors(&HashMap::new()),
            Err(StoreError::Validation(_))
        ));

        // Statuses untouched.
        let chunk = store.get_chunk(chunks[0].id.unwrap())?.unwrap();
        assert_eq!(chunk.embedding_status, EmbeddingStatus::Pending);
        Ok(())
    }

    #[test]
    fn test_bulk_update_vectors_unknown_chunk_rolls_back() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![Chunk::new(0, "alpha", ChunkType::Text)];
        store.save(&mut doc, &mut chunks)?;
        let known = chunks[0].id.unwrap();

        let mut vectors = HashMap::new();
        vectors.insert(known, vec![1.0, 0.0, 0.0, 0.0]);
        vectors.insert(known + 1000, vec![0.0, 1.0, 0.0, 0.0]);

        assert!(matches!(
            store.bulk_update_vectors(&vectors),
            Err(StoreError::NotFound(_))
        ));

        // Zero partial writes: the known chunk is still pending, no vector.
        let chunk = store.get_chunk(known)?.unwrap();
        assert_eq!(chunk.embedding_status, EmbeddingStatus::Pending);
        assert_eq!(store.stats()?.vector_count, 0);
        Ok(())
    }

    #[test]
    fn test_mark_embeddings_failed() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![Chunk::new(0, "alpha", ChunkType::Text)];
        store.save(&mut doc, &mut chunks)?;
        let id = chunks[0].id.unwrap();
        store.assign_batch_job(&[id], "job-1")?;

        store.mark_embeddings_failed(&[id], "provider timeout")?;

        let chunk = store.get_chunk(id)?.unwrap();
        assert_eq!(chunk.embedding_status, EmbeddingStatus::Failed);
        assert_eq!(chunk.error_message.as_deref(), Some("provider timeout"));
        assert!(chunk.batch_job_id.is_none());
        assert_eq!(store.stats()?.vector_count, 0);
        Ok(())
    }

    #[test]
    fn test_mark_embeddings_failed_rejects_ready_chunk() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks =
            vec![Chunk::new(0, "alpha", ChunkType::Text).with_embedding(vec![1.0, 0.0, 0.0, 0.0])];
        store.save(&mut doc, &mut chunks)?;
        let id = chunks[0].id.unwrap();

        assert!(matches!(
            store.mark_embeddings_failed(&[id], "oops"),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.mark_embeddings_failed(&[id + 1000], "oops"),
            Err(StoreError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_assign_batch_job_skips_non_pending() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(0, "alpha", ChunkType::Text).with_embedding(vec![1.0, 0.0, 0.0, 0.0]),
            Chunk::new(1, "beta", ChunkType::Text),
        ];
        store.save(&mut doc, &mut chunks)?;
        let ids: Vec<i64> = chunks.iter().map(|c| c.id.unwrap()).collect();

        let tagged = store.assign_batch_job(&ids, "job-7")?;
        assert_eq!(tagged, 1);

        let pending = store.get_chunk(ids[1])?.unwrap();
        assert_eq!(pending.batch_job_id.as_deref(), Some("job-7"));
        let ready = store.get_chunk(ids[0])?.unwrap();
        assert!(ready.batch_job_id.is_none());
        Ok(())
    }

    #[test]
    fn test_pending_chunks_lists_oldest_first() -> anyhow::Result<()> {
        let mut store = store();
        let mut doc = Document::new("doc", MediaType::Text);
        let mut chunks = vec![
            Chunk::new(0, "alpha", ChunkType::Text).with_embedding(vec![1.0, 0.0, 0.0, 0.0]),
            Chunk::new(1, "beta", ChunkType::Text),
            Chunk::new(2, "gamma", ChunkType::Text),
        ];
        store.save(&mut doc, &mut chunks)?;

        let pending = store.pending_chunks(10)?;
        assert_eq!(pending.len(), 2);
        assert!(pending
            .iter()
            .all(|c| c.embedding_status == EmbeddingStatus::Pending));
        assert!(pending[0].id < pending[1].id);

        assert_eq!(store.pending_chunks(1)?.len(), 1);
        Ok(())
    }
}
