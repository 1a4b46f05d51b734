//! Mapping between records and Tantivy documents.
//!
//! Numbers are stored as exact i64/f64 values. Everything else is stored as
//! canonical text, which is also the form used when a value has to travel
//! through query text or a directory name.

use chrono::{DateTime, SecondsFormat, Utc};
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use uuid::Uuid;

use tabsearch_types::{FieldType, FieldValue, Record};

use crate::error::IndexError;
use crate::schema::IndexSchema;

/// Text of `i32::MIN`.
pub const INT32_MIN_LITERAL: &str = "-2147483648";

/// Text of `i64::MIN`.
pub const INT64_MIN_LITERAL: &str = "-9223372036854775808";

/// Text of `f64::MIN`. Parsed as a float it rounds past `f64::MAX` and
/// becomes `-inf`, so it is matched literally.
pub const FLOAT64_MIN_LITERAL: &str = "-1.79769313486232E+308";

/// Canonical text form of a value.
pub fn encode_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Int32(i32::MIN) => INT32_MIN_LITERAL.to_string(),
        FieldValue::Int32(v) => v.to_string(),
        FieldValue::Int64(i64::MIN) => INT64_MIN_LITERAL.to_string(),
        FieldValue::Int64(v) => v.to_string(),
        FieldValue::Float64(v) if *v == f64::MIN => FLOAT64_MIN_LITERAL.to_string(),
        FieldValue::Float64(v) => v.to_string(),
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::Text(v) => v.clone(),
        FieldValue::Identifier(v) => v.hyphenated().to_string(),
        FieldValue::Timestamp(v) => v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    }
}

/// Parse canonical text back into a value of the declared type.
pub fn decode_text(field: &str, field_type: FieldType, text: &str) -> Result<FieldValue, IndexError> {
    let err = |reason: &dyn ToString| IndexError::decode(field, field_type, text, reason.to_string());

    match field_type {
        FieldType::Int32 if text == INT32_MIN_LITERAL => Ok(FieldValue::Int32(i32::MIN)),
        FieldType::Int32 => text
            .trim()
            .parse::<i32>()
            .map(FieldValue::Int32)
            .map_err(|e| err(&e)),
        FieldType::Int64 if text == INT64_MIN_LITERAL => Ok(FieldValue::Int64(i64::MIN)),
        FieldType::Int64 => text
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int64)
            .map_err(|e| err(&e)),
        FieldType::Float64 if text == FLOAT64_MIN_LITERAL => Ok(FieldValue::Float64(f64::MIN)),
        FieldType::Float64 => text
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float64)
            .map_err(|e| err(&e)),
        FieldType::Bool => {
            let trimmed = text.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(FieldValue::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(FieldValue::Bool(false))
            } else {
                Err(err(&"expected true or false"))
            }
        }
        FieldType::ShortText | FieldType::LongText => Ok(FieldValue::Text(text.to_string())),
        FieldType::Identifier => Uuid::parse_str(text.trim())
            .map(FieldValue::Identifier)
            .map_err(|e| err(&e)),
        FieldType::Timestamp => DateTime::parse_from_rfc3339(text.trim())
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|e| err(&e)),
    }
}

/// Convert a record to a Tantivy document.
///
/// Unset fields are left out of the document.
pub fn record_to_doc(schema: &IndexSchema, record: &Record) -> TantivyDocument {
    let mut doc = TantivyDocument::default();
    for (descriptor, value) in record.populated() {
        let Some(field) = schema.field(&descriptor.name) else {
            continue;
        };
        match value {
            FieldValue::Int32(v) => doc.add_i64(field, i64::from(*v)),
            FieldValue::Int64(v) => doc.add_i64(field, *v),
            FieldValue::Float64(v) => doc.add_f64(field, *v),
            other => doc.add_text(field, encode_text(other)),
        }
    }
    doc
}

/// Rebuild a record from a stored Tantivy document.
///
/// Fields missing from the document stay unset.
pub fn doc_to_record(schema: &IndexSchema, doc: &TantivyDocument) -> Result<Record, IndexError> {
    let mut record = Record::new(schema.record_schema().clone());

    for (descriptor, field) in schema.bindings() {
        let Some(stored) = doc.get_first(field) else {
            continue;
        };
        let name = descriptor.name.as_str();
        let field_type = descriptor.field_type;

        let value = match field_type {
            FieldType::Int32 => {
                let raw = stored
                    .as_i64()
                    .ok_or_else(|| IndexError::decode(name, field_type, "", "not an integer"))?;
                let narrowed = i32::try_from(raw).map_err(|e| {
                    IndexError::decode(name, field_type, raw.to_string(), e)
                })?;
                FieldValue::Int32(narrowed)
            }
            FieldType::Int64 => FieldValue::Int64(
                stored
                    .as_i64()
                    .ok_or_else(|| IndexError::decode(name, field_type, "", "not an integer"))?,
            ),
            FieldType::Float64 => FieldValue::Float64(
                stored
                    .as_f64()
                    .ok_or_else(|| IndexError::decode(name, field_type, "", "not a float"))?,
            ),
            _ => {
                let text = stored
                    .as_str()
                    .ok_or_else(|| IndexError::decode(name, field_type, "", "not text"))?;
                decode_text(name, field_type, text)?
            }
        };
        record.set(name, value)?;
    }

    Ok(record)
}
