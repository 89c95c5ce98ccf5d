//! Error taxonomy for store operations.

use thiserror::Error;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the store.
///
/// Every mutating operation runs inside one transaction; an error means the
/// transaction rolled back and nothing was applied.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Empty or contradictory input (empty chunk set, duplicate chunk index,
    /// wrong-length embedding, malformed filter key).
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend read/write failure; the transaction was rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrepairable catalog damage. Repairable index divergence is rebuilt
    /// at open time instead of surfacing here.
    #[error("consistency error: {0}")]
    Consistency(String),
}
