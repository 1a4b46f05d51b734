//! Field type tags and typed field values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported field type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int32,
    Int64,
    Float64,
    Bool,
    /// Short text, indexed as a single token.
    ShortText,
    /// Long text, analyzed into words.
    LongText,
    Identifier,
    Timestamp,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float64 => "float64",
            FieldType::Bool => "bool",
            FieldType::ShortText => "short_text",
            FieldType::LongText => "long_text",
            FieldType::Identifier => "identifier",
            FieldType::Timestamp => "timestamp",
        }
    }

    /// Parse from string, returning None for unknown tags.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "int32" => Some(FieldType::Int32),
            "int64" => Some(FieldType::Int64),
            "float64" => Some(FieldType::Float64),
            "bool" => Some(FieldType::Bool),
            "short_text" => Some(FieldType::ShortText),
            "long_text" => Some(FieldType::LongText),
            "identifier" => Some(FieldType::Identifier),
            "timestamp" => Some(FieldType::Timestamp),
            _ => None,
        }
    }

    /// True for the types stored as exact numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Int32 | FieldType::Int64 | FieldType::Float64
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown field type: {}", s))
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    /// Value of a short-text or long-text field.
    Text(String),
    Identifier(Uuid),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Int32(_) => "int32",
            FieldValue::Int64(_) => "int64",
            FieldValue::Float64(_) => "float64",
            FieldValue::Bool(_) => "bool",
            FieldValue::Text(_) => "text",
            FieldValue::Identifier(_) => "identifier",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }

    /// Whether this value may be stored in a field of the given type.
    pub fn fits(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (FieldValue::Int32(_), FieldType::Int32)
                | (FieldValue::Int64(_), FieldType::Int64)
                | (FieldValue::Float64(_), FieldType::Float64)
                | (FieldValue::Bool(_), FieldType::Bool)
                | (FieldValue::Text(_), FieldType::ShortText)
                | (FieldValue::Text(_), FieldType::LongText)
                | (FieldValue::Identifier(_), FieldType::Identifier)
                | (FieldValue::Timestamp(_), FieldType::Timestamp)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int32(v) => Some(i64::from(*v)),
            FieldValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float64(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Identifier(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}
