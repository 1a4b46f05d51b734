//! Tantivy schema derived from a record schema.
//!
//! Field options by type tag:
//! - int32/int64: i64, INDEXED | STORED | FAST
//! - float64: f64, INDEXED | STORED | FAST
//! - bool: text, default tokenizer, basic postings
//! - short_text: text, keyword tokenizer, positions
//! - long_text: text, default tokenizer, positions
//! - identifier/timestamp: text, keyword tokenizer, basic postings

use std::sync::Arc;

use tantivy::schema::{
    Field, FieldEntry, FieldType as EngineFieldType, IndexRecordOption, Schema, TextFieldIndexing,
    TextOptions, FAST, INDEXED, STORED,
};
use tantivy::tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer};
use tantivy::Index;
use tracing::warn;

use tabsearch_types::{FieldDescriptor, FieldType, RecordSchema, TypesError};

use crate::error::IndexError;

/// Single-token, lowercased analyzer for exact-match text fields.
pub const KEYWORD_TOKENIZER: &str = "keyword";

/// Tantivy's word analyzer (simple tokenizer, length limit, lowercase).
pub const DEFAULT_TOKENIZER: &str = "default";

/// Tokenizer and postings used for a text-backed type tag.
fn text_indexing(field_type: FieldType) -> Option<(&'static str, IndexRecordOption)> {
    match field_type {
        FieldType::Int32 | FieldType::Int64 | FieldType::Float64 => None,
        FieldType::Bool => Some((DEFAULT_TOKENIZER, IndexRecordOption::Basic)),
        FieldType::ShortText => Some((
            KEYWORD_TOKENIZER,
            IndexRecordOption::WithFreqsAndPositions,
        )),
        FieldType::LongText => Some((
            DEFAULT_TOKENIZER,
            IndexRecordOption::WithFreqsAndPositions,
        )),
        FieldType::Identifier | FieldType::Timestamp => {
            Some((KEYWORD_TOKENIZER, IndexRecordOption::Basic))
        }
    }
}

fn text_options(tokenizer: &str, record_option: IndexRecordOption) -> TextOptions {
    TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(tokenizer)
                .set_index_option(record_option),
        )
        .set_stored()
}

/// Register the analyzers the derived schemas refer to.
///
/// Tokenizers are not persisted with the index, so this must run on every
/// index handle before writing or parsing queries.
pub fn register_tokenizers(index: &Index) {
    index.tokenizers().register(
        KEYWORD_TOKENIZER,
        TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build(),
    );
}

/// Tantivy schema plus field handles in record-schema order.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    schema: Schema,
    record_schema: Arc<RecordSchema>,
    fields: Vec<Field>,
}

impl IndexSchema {
    /// Derive a fresh Tantivy schema from a record schema.
    ///
    /// The record schema is validated first; duplicate or unusable field
    /// names are rejected here instead of reaching the engine.
    pub fn build(record_schema: Arc<RecordSchema>) -> Result<Self, IndexError> {
        record_schema.validate()?;
        if let Some(bad) = record_schema.fields.iter().find(|f| f.name.starts_with('-')) {
            return Err(TypesError::InvalidInput(format!(
                "field name '{}' may not start with '-'",
                bad.name
            ))
            .into());
        }

        let mut builder = Schema::builder();
        let mut fields = Vec::with_capacity(record_schema.fields.len());

        for descriptor in &record_schema.fields {
            let name = descriptor.name.as_str();
            if descriptor.boost.is_some() && descriptor.boost_value().is_none() {
                warn!(field = name, boost = ?descriptor.boost, "Ignoring unparsable boost");
            }
            let field = match text_indexing(descriptor.field_type) {
                Some((tokenizer, record_option)) => {
                    builder.add_text_field(name, text_options(tokenizer, record_option))
                }
                None if descriptor.field_type == FieldType::Float64 => {
                    builder.add_f64_field(name, INDEXED | STORED | FAST)
                }
                None => builder.add_i64_field(name, INDEXED | STORED | FAST),
            };
            fields.push(field);
        }

        Ok(Self {
            schema: builder.build(),
            record_schema,
            fields,
        })
    }

    /// Bind a record schema to an existing Tantivy schema.
    ///
    /// Every declared field must exist with a compatible kind.
    pub fn from_schema(record_schema: Arc<RecordSchema>, schema: Schema) -> Result<Self, IndexError> {
        record_schema.validate()?;
        let mut fields = Vec::with_capacity(record_schema.fields.len());
        for descriptor in &record_schema.fields {
            let field = schema.get_field(&descriptor.name).map_err(|_| {
                IndexError::SchemaMismatch(format!(
                    "index for table '{}' has no field '{}'",
                    record_schema.table_name, descriptor.name
                ))
            })?;
            let entry = schema.get_field_entry(field);
            if !entry_matches(descriptor.field_type, entry) {
                return Err(IndexError::SchemaMismatch(format!(
                    "field '{}' is not indexed as {}",
                    descriptor.name, descriptor.field_type
                )));
            }
            fields.push(field);
        }

        Ok(Self {
            schema,
            record_schema,
            fields,
        })
    }

    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn record_schema(&self) -> &Arc<RecordSchema> {
        &self.record_schema
    }

    /// Field handle for a record field name.
    pub fn field(&self, name: &str) -> Option<Field> {
        self.record_schema.position(name).map(|idx| self.fields[idx])
    }

    /// Descriptors paired with their field handles, in schema order.
    pub fn bindings(&self) -> impl Iterator<Item = (&FieldDescriptor, Field)> {
        self.record_schema
            .fields
            .iter()
            .zip(self.fields.iter().copied())
    }

    /// Declared, parsable boosts.
    pub fn boosts(&self) -> impl Iterator<Item = (Field, f32)> + '_ {
        self.bindings()
            .filter_map(|(descriptor, field)| descriptor.boost_value().map(|b| (field, b)))
    }
}

fn entry_matches(field_type: FieldType, entry: &FieldEntry) -> bool {
    match (field_type, entry.field_type()) {
        (FieldType::Int32 | FieldType::Int64, EngineFieldType::I64(_)) => true,
        (FieldType::Float64, EngineFieldType::F64(_)) => true,
        (other, EngineFieldType::Str(options)) => match text_indexing(other) {
            Some((tokenizer, _)) => options
                .get_indexing_options()
                .map(|indexing| indexing.tokenizer() == tokenizer)
                .unwrap_or(false),
            None => false,
        },
        _ => false,
    }
}
