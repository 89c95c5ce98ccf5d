//! Persisted catalog: schema creation and open-time consistency repair.

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::core::error::Result;

/// Core tables. Idempotent; safe to run on every open.
pub(crate) const SCHEMA_SQL: &str = r#"
-- Documents: the unit of ingestion
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    media_type TEXT NOT NULL CHECK(media_type IN ('text', 'image', 'video', 'audio')),
    created_at INTEGER NOT NULL
);

-- Chunks: the atomic indexed unit, cascade-deleted with their document
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    chunk_type TEXT NOT NULL CHECK(chunk_type IN ('text', 'code', 'table', 'image_ref', 'audio_ref', 'video_ref')),
    language TEXT,
    embedding_status TEXT NOT NULL CHECK(embedding_status IN ('pending', 'ready', 'failed')),
    batch_job_id TEXT,
    error_message TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    UNIQUE(doc_id, chunk_index)
);

-- Vector index, keyed by chunk id (dimension recorded in store_meta)
CREATE TABLE IF NOT EXISTS chunk_vectors (
    chunk_id INTEGER PRIMARY KEY REFERENCES chunks(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL
);

-- Catalog metadata
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id);
CREATE INDEX IF NOT EXISTS idx_chunks_type_language ON chunks(chunk_type, language);
"#;

/// Inverted text index, rowid = chunk id. Kept in sync by explicit write
/// hooks inside each mutating transaction, not by triggers.
pub(crate) const FTS_SCHEMA_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS chunk_fts USING fts5(
    content,
    tokenize='porter unicode61'
);
"#;

/// Initialize the core tables.
pub(crate) fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Outcome of the open-time text index check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextIndexRepair {
    InSync,
    Populated(usize),
    Rebuilt(usize),
}

/// Reconcile the inverted text index with the chunk table.
///
/// Runs on every open. A missing index table (first open, or a database
/// from before the index existed) is created and bulk-populated; a row
/// count mismatch is treated as corruption and the index is rebuilt from
/// chunk contents. Matching counts are a no-op.
pub(crate) fn reconcile_text_index(conn: &mut Connection) -> Result<TextIndexRepair> {
    if !table_exists(conn, "chunk_fts")? {
        conn.execute_batch(FTS_SCHEMA_SQL)?;
    }

    let chunk_count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
    let fts_count: i64 = conn.query_row("SELECT COUNT(*) FROM chunk_fts", [], |row| row.get(0))?;

    if fts_count == chunk_count {
        return Ok(TextIndexRepair::InSync);
    }

    let tx = conn.transaction()?;
    let repair = if fts_count == 0 {
        tx.execute(
            "INSERT INTO chunk_fts(rowid, content) SELECT id, content FROM chunks",
            [],
        )?;
        TextIndexRepair::Populated(chunk_count as usize)
    } else {
        tx.execute("INSERT INTO chunk_fts(chunk_fts) VALUES('delete-all')", [])?;
        tx.execute(
            "INSERT INTO chunk_fts(rowid, content) SELECT id, content FROM chunks",
            [],
        )?;
        TextIndexRepair::Rebuilt(chunk_count as usize)
    };
    tx.commit()?;

    match repair {
        TextIndexRepair::Populated(n) => {
            debug!(chunks = n, "text index populated from existing chunks");
        }
        TextIndexRepair::Rebuilt(n) => {
            warn!(
                chunks = n,
                "text index diverged from chunk table, rebuilt from chunk contents"
            );
        }
        TextIndexRepair::InSync => {}
    }

    Ok(repair)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        rusqlite::params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
