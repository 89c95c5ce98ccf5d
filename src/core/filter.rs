//! Typed metadata predicates and chunk-level filter pushdown.
//!
//! Filters are conjunctions of exact-match clauses built through a typed
//! API and compiled to parameter-bound SQL over the JSON metadata columns.
//! No value ever reaches the SQL text itself.

use rusqlite::types::Value;

use super::chunk::ChunkType;
use super::error::{Result, StoreError};

/// A scalar a metadata predicate compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl FilterValue {
    fn to_sql_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::Text(s.clone()),
            Self::Integer(n) => Value::Integer(*n),
            Self::Float(x) => Value::Real(*x),
            // json_extract yields 0/1 for JSON booleans
            Self::Bool(b) => Value::Integer(i64::from(*b)),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Conjunction of exact-match predicates over metadata keys.
///
/// ```
/// use mnemosyne::MetadataFilter;
///
/// let filter = MetadataFilter::new().eq("tag", "x").eq("year", 2024);
/// assert_eq!(filter.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    clauses: Vec<(String, FilterValue)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause; all clauses are ANDed together.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.clauses.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Reject malformed keys instead of silently dropping them.
    pub fn validate(&self) -> Result<()> {
        for (key, _) in &self.clauses {
            if key.is_empty() {
                return Err(StoreError::Validation(
                    "metadata filter key is empty".to_string(),
                ));
            }
            if key.contains('"') || key.chars().any(char::is_control) {
                return Err(StoreError::Validation(format!(
                    "malformed metadata filter key: {key:?}"
                )));
            }
        }
        Ok(())
    }

    /// Compile to a SQL conjunction over a JSON metadata column.
    ///
    /// Both the JSON path and the compared value are bound parameters, in
    /// clause order. The returned fragment is empty when the filter is.
    pub(crate) fn compile(&self, column: &str) -> (String, Vec<Value>) {
        let mut fragments = Vec::with_capacity(self.clauses.len());
        let mut params = Vec::with_capacity(self.clauses.len() * 2);
        for (key, value) in &self.clauses {
            fragments.push(format!("json_extract({column}, ?) = ?"));
            params.push(Value::Text(format!("$.\"{key}\"")));
            params.push(value.to_sql_value());
        }
        (fragments.join(" AND "), params)
    }
}

/// Chunk-granularity filter set: metadata predicates plus `chunk_type` and
/// `language` pushdown, served by the composite secondary index.
#[derive(Debug, Clone, Default)]
pub struct ChunkFilter {
    pub metadata: Option<MetadataFilter>,
    pub chunk_type: Option<ChunkType>,
    pub language: Option<String>,
}

impl ChunkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, filter: MetadataFilter) -> Self {
        self.metadata = Some(filter);
        self
    }

    pub fn with_chunk_type(mut self, chunk_type: ChunkType) -> Self {
        self.chunk_type = Some(chunk_type);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}
