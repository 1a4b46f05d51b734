//! Index adapter error types.

use thiserror::Error;

use tabsearch_types::{FieldType, TypesError};

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Tantivy index error (I/O, lock contention, corrupt segments)
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// Filter text rejected by the query grammar
    #[error("Query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record model error
    #[error(transparent)]
    Types(#[from] TypesError),

    /// On-disk index does not match the record schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Stored value cannot be read back as its declared type
    #[error("Cannot decode '{value}' as {field_type} for field '{field}': {reason}")]
    Decode {
        field: String,
        field_type: FieldType,
        value: String,
        reason: String,
    },

    /// Operation not supported by this adapter
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// Record has no value for its schema's storage key field
    #[error("Record for table '{table}' has no storage key '{field}'")]
    MissingStorageKey { table: String, field: String },

    /// Storage key or table name cannot be used as a directory name
    #[error("Invalid partition component: {0:?}")]
    InvalidPartition(String),

    /// Shared state lock was poisoned by a panicking thread
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl IndexError {
    pub(crate) fn decode(
        field: &str,
        field_type: FieldType,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        IndexError::Decode {
            field: field.to_string(),
            field_type,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
