//! Error types for the tabsearch record model.

use thiserror::Error;

use crate::field::FieldType;

/// Errors raised while building schemas, records or settings.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Field is not declared by the record schema
    #[error("Unknown field '{field}' for table '{table}'")]
    UnknownField { table: String, field: String },

    /// Value does not fit the declared field type
    #[error("Field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: &'static str,
    },
}
