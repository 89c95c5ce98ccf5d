//! Query engine: vector, text and hybrid search plus sibling expansion.
//!
//! Vector search scans the indexed embeddings and ranks by cosine
//! similarity in Rust; text search ranks through FTS5 bm25; hybrid search
//! runs both and fuses the candidate lists with Reciprocal Rank Fusion.
//! Every search exists at document and chunk granularity.

use std::collections::{HashMap, HashSet};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::core::chunk::Chunk;
use crate::core::document::Document;
use crate::core::error::{Result, StoreError};
use crate::core::filter::{ChunkFilter, MetadataFilter};
use crate::core::sanitize::sanitize_match_query;

use super::vector::{blob_to_embedding, cosine_similarity};
use super::{chunk_from_row, Store, CHUNK_COLUMNS};

/// Default RRF constant, applied at both granularities.
pub const DEFAULT_RRF_K: u32 = 60;

/// Per-method candidate cap inside hybrid search, independent of `limit`.
pub const CANDIDATE_POOL: usize = 100;

/// A document-granularity search result.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentHit {
    pub document: Document,
    pub score: f32,
}

/// A chunk-granularity search result.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkHit {
    pub chunk: Chunk,
    pub score: f32,
}

impl Store {
    /// Rank documents against a query vector.
    ///
    /// A document is represented by its best-matching chunk (max score
    /// aggregation). Scores are `max(0, cosine similarity)`. Only chunks
    /// with an indexed vector participate.
    pub fn vector_search_documents(
        &self,
        query_vector: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<DocumentHit>> {
        self.check_dimension(query_vector)?;
        let filter = filter.filter(|f| !f.is_empty());

        let mut sql = String::from(
            "SELECT c.doc_id, v.embedding
             FROM chunks c JOIN chunk_vectors v ON v.chunk_id = c.id",
        );
        let mut bound: Vec<Value> = Vec::new();
        if let Some(f) = filter {
            f.validate()?;
            let (where_sql, values) = f.compile("d.metadata");
            sql.push_str(" JOIN documents d ON d.id = c.doc_id WHERE ");
            sql.push_str(&where_sql);
            bound.extend(values);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut best: HashMap<i64, f32> = HashMap::new();
        for row in rows {
            let (doc_id, blob) = row?;
            let score = cosine_similarity(query_vector, &blob_to_embedding(&blob)).max(0.0);
            let entry = best.entry(doc_id).or_insert(0.0);
            *entry = entry.max(score);
        }

        let mut ranked: Vec<(i64, f32)> = best.into_iter().collect();
        sort_ranked(&mut ranked);
        ranked.truncate(limit);
        self.hydrate_documents(ranked)
    }

    /// Rank chunks against a query vector, with optional metadata and
    /// `chunk_type`/`language` pushdown. Returned chunks carry their
    /// stored embedding.
    pub fn vector_search_chunks(
        &self,
        query_vector: &[f32],
        filters: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<ChunkHit>> {
        self.check_dimension(query_vector)?;

        let mut sql = format!(
            "SELECT {CHUNK_COLUMNS}, v.embedding
             FROM chunks c JOIN chunk_vectors v ON v.chunk_id = c.id"
        );
        let (where_sql, bound) = chunk_filter_sql(filters)?;
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            let chunk = chunk_from_row(row)?;
            let blob: Vec<u8> = row.get(11)?;
            Ok((chunk, blob))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (mut chunk, blob) = row?;
            let embedding = blob_to_embedding(&blob);
            let score = cosine_similarity(query_vector, &embedding).max(0.0);
            chunk.embedding = Some(embedding);
            hits.push(ChunkHit { chunk, score });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Rank documents against a text query through the inverted index.
    ///
    /// A document is represented by its best-ranked chunk; scores are
    /// negated bm25 (higher is better).
    pub fn text_search_documents(
        &self,
        query_text: &str,
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<DocumentHit>> {
        let match_query = sanitize_match_query(query_text);
        if match_query.is_empty() {
            return Err(StoreError::Validation("query text is empty".to_string()));
        }
        let filter = filter.filter(|f| !f.is_empty());

        let mut sql = String::from(
            "SELECT c.doc_id, bm25(chunk_fts)
             FROM chunk_fts JOIN chunks c ON c.id = chunk_fts.rowid",
        );
        if filter.is_some() {
            sql.push_str(" JOIN documents d ON d.id = c.doc_id");
        }
        sql.push_str(" WHERE chunk_fts MATCH ?");
        let mut bound = vec![Value::Text(match_query)];
        if let Some(f) = filter {
            f.validate()?;
            let (where_sql, values) = f.compile("d.metadata");
            sql.push_str(" AND ");
            sql.push_str(&where_sql);
            bound.extend(values);
        }
        sql.push_str(" ORDER BY bm25(chunk_fts) ASC, c.doc_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        })?;

        // Rows arrive best-rank-first; the first row per document is its
        // best chunk.
        let mut ranked: Vec<(i64, f32)> = Vec::new();
        let mut seen = HashSet::new();
        for row in rows {
            let (doc_id, rank) = row?;
            if seen.insert(doc_id) {
                ranked.push((doc_id, (-rank) as f32));
                if ranked.len() == limit {
                    break;
                }
            }
        }
        self.hydrate_documents(ranked)
    }

    /// Rank chunks against a text query through the inverted index, with
    /// optional metadata and `chunk_type`/`language` pushdown.
    pub fn text_search_chunks(
        &self,
        query_text: &str,
        filters: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<ChunkHit>> {
        let match_query = sanitize_match_query(query_text);
        if match_query.is_empty() {
            return Err(StoreError::Validation("query text is empty".to_string()));
        }

        let mut sql = format!(
            "SELECT {CHUNK_COLUMNS}, bm25(chunk_fts)
             FROM chunk_fts JOIN chunks c ON c.id = chunk_fts.rowid
             WHERE chunk_fts MATCH ?"
        );
        let mut bound = vec![Value::Text(match_query)];
        let (where_sql, values) = chunk_filter_sql(filters)?;
        if !where_sql.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(&where_sql);
            bound.extend(values);
        }
        sql.push_str(" ORDER BY bm25(chunk_fts) ASC, c.id ASC LIMIT ?");
        bound.push(Value::Integer(limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            let chunk = chunk_from_row(row)?;
            let rank: f64 = row.get(11)?;
            Ok(ChunkHit {
                chunk,
                score: (-rank) as f32,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Hybrid document search: vector and text search run independently
    /// (each capped at [`CANDIDATE_POOL`] candidates) and are fused by
    /// Reciprocal Rank Fusion with constant `k`.
    ///
    /// With only one of the two queries supplied this degrades directly to
    /// that single method; with neither it is a validation error.
    pub fn hybrid_search_documents(
        &self,
        query_vector: Option<&[f32]>,
        query_text: Option<&str>,
        filter: Option<&MetadataFilter>,
        limit: usize,
        k: u32,
    ) -> Result<Vec<DocumentHit>> {
        match (query_vector, query_text) {
            (None, None) => Err(StoreError::Validation(
                "hybrid search needs a query vector, query text, or both".to_string(),
            )),
            (Some(vector), None) => self.vector_search_documents(vector, filter, limit),
            (None, Some(text)) => self.text_search_documents(text, filter, limit),
            (Some(vector), Some(text)) => {
                let vector_hits = self.vector_search_documents(vector, filter, CANDIDATE_POOL)?;
                let text_hits = self.text_search_documents(text, filter, CANDIDATE_POOL)?;

                let vector_ids: Vec<i64> =
                    vector_hits.iter().filter_map(|h| h.document.id).collect();
                let text_ids: Vec<i64> = text_hits.iter().filter_map(|h| h.document.id).collect();
                let fused = rrf_fuse(&vector_ids, &text_ids, k);

                let mut by_id: HashMap<i64, Document> = HashMap::new();
                for hit in vector_hits.into_iter().chain(text_hits) {
                    if let Some(id) = hit.document.id {
                        by_id.entry(id).or_insert(hit.document);
                    }
                }

                let mut hits = Vec::with_capacity(limit.min(fused.len()));
                for (id, score) in fused.into_iter().take(limit) {
                    if let Some(document) = by_id.remove(&id) {
                        hits.push(DocumentHit { document, score });
                    }
                }
                Ok(hits)
            }
        }
    }

    /// Hybrid chunk search; see [`Store::hybrid_search_documents`].
    pub fn hybrid_search_chunks(
        &self,
        query_vector: Option<&[f32]>,
        query_text: Option<&str>,
        filters: &ChunkFilter,
        limit: usize,
        k: u32,
    ) -> Result<Vec<ChunkHit>> {
        match (query_vector, query_text) {
            (None, None) => Err(StoreError::Validation(
                "hybrid search needs a query vector, query text, or both".to_string(),
            )),
            (Some(vector), None) => self.vector_search_chunks(vector, filters, limit),
            (None, Some(text)) => self.text_search_chunks(text, filters, limit),
            (Some(vector), Some(text)) => {
                let vector_hits = self.vector_search_chunks(vector, filters, CANDIDATE_POOL)?;
                let text_hits = self.text_search_chunks(text, filters, CANDIDATE_POOL)?;

                let vector_ids: Vec<i64> = vector_hits.iter().filter_map(|h| h.chunk.id).collect();
                let text_ids: Vec<i64> = text_hits.iter().filter_map(|h| h.chunk.id).collect();
                let fused = rrf_fuse(&vector_ids, &text_ids, k);

                let mut by_id: HashMap<i64, Chunk> = HashMap::new();
                for hit in vector_hits.into_iter().chain(text_hits) {
                    if let Some(id) = hit.chunk.id {
                        by_id.entry(id).or_insert(hit.chunk);
                    }
                }

                let mut hits = Vec::with_capacity(limit.min(fused.len()));
                for (id, score) in fused.into_iter().take(limit) {
                    if let Some(chunk) = by_id.remove(&id) {
                        hits.push(ChunkHit { chunk, score });
                    }
                }
                Ok(hits)
            }
        }
    }

    /// Up to `window` chunks before and after `chunk_id` within the same
    /// parent, ordered by chunk index. Returns the whole document when the
    /// window covers it. An unknown chunk id returns an empty list.
    pub fn sibling_chunks(&self, chunk_id: i64, window: u32) -> Result<Vec<Chunk>> {
        let anchor = self
            .conn
            .query_row(
                "SELECT doc_id, chunk_index FROM chunks WHERE id = ?1",
                params![chunk_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, u32>(1)?)),
            )
            .optional()?;

        let Some((doc_id, index)) = anchor else {
            debug!(chunk_id, "sibling lookup for unknown chunk id");
            return Ok(Vec::new());
        };

        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE doc_id = ?1",
            params![doc_id],
            |row| row.get(0),
        )?;
        if i64::from(window) * 2 + 1 >= total {
            return self.document_chunks(doc_id);
        }

        let lo = index.saturating_sub(window);
        let hi = index.saturating_add(window);
        let sql = format!(
            "SELECT {CHUNK_COLUMNS}, v.embedding
             FROM chunks c LEFT JOIN chunk_vectors v ON v.chunk_id = c.id
             WHERE c.doc_id = ?1 AND c.chunk_index BETWEEN ?2 AND ?3
             ORDER BY c.chunk_index ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![doc_id, lo, hi], super::chunk_with_embedding_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    fn hydrate_documents(&self, ranked: Vec<(i64, f32)>) -> Result<Vec<DocumentHit>> {
        let mut hits = Vec::with_capacity(ranked.len());
        for (doc_id, score) in ranked {
            if let Some(document) = self.get_document(doc_id)? {
                hits.push(DocumentHit { document, score });
            }
        }
        Ok(hits)
    }
}

/// Reciprocal Rank Fusion over two ranked id lists.
///
/// Each id contributes `1/(k + rank)` per list it appears in, ranks
/// 1-based; a missing term contributes 0. The fused list is sorted by
/// score descending, ties broken by ascending id.
pub(crate) fn rrf_fuse(vector_ids: &[i64], text_ids: &[i64], k: u32) -> Vec<(i64, f32)> {
    let mut scores: HashMap<i64, f32> =
        HashMap::with_capacity(vector_ids.len() + text_ids.len());

    for (rank, id) in vector_ids.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) += 1.0 / (k as f32 + rank as f32 + 1.0);
    }
    for (rank, id) in text_ids.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) += 1.0 / (k as f32 + rank as f32 + 1.0);
    }

    let mut fused: Vec<(i64, f32)> = scores.into_iter().collect();
    sort_ranked(&mut fused);
    fused
}

fn sort_ranked(ranked: &mut [(i64, f32)]) {
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

/// WHERE fragment and bound parameters for chunk-granularity pushdown.
fn chunk_filter_sql(filters: &ChunkFilter) -> Result<(String, Vec<Value>)> {
    let mut clauses = Vec::new();
    let mut bound = Vec::new();

    if let Some(chunk_type) = filters.chunk_type {
        clauses.push("c.chunk_type = ?".to_string());
        bound.push(Value::Text(chunk_type.as_str().to_string()));
    }
    if let Some(language) = &filters.language {
        clauses.push("c.language = ?".to_string());
        bound.push(Value::Text(language.clone()));
    }
    if let Some(metadata) = &filters.metadata {
        if !metadata.is_empty() {
            metadata.validate()?;
            let (where_sql, values) = metadata.compile("c.metadata");
            clauses.push(where_sql);
            bound.extend(values);
        }
    }

    Ok((clauses.join(" AND "), bound))
}
