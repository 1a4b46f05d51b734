//! Composite query construction.
//!
//! Key equality becomes native term queries; the filter expression is
//! rendered to text and handed to Tantivy's query parser. Both parts are
//! required (AND). With neither present the query matches everything.

use tantivy::query::{AllQuery, BooleanQuery, BoostQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, Term};
use tracing::debug;

use tabsearch_types::{FieldDescriptor, FieldValue, FilterExpression, Record};

use crate::codec::encode_text;
use crate::error::IndexError;
use crate::filter::render_filter;
use crate::schema::IndexSchema;

/// Builds queries against one partition index.
pub struct QueryBuilder<'a> {
    index: &'a Index,
    schema: &'a IndexSchema,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(index: &'a Index, schema: &'a IndexSchema) -> Self {
        Self { index, schema }
    }

    /// Exact-match clauses for every populated query-key field.
    pub fn key_clauses(&self, record: &Record) -> Vec<Box<dyn Query>> {
        let mut clauses: Vec<Box<dyn Query>> = Vec::new();
        for (descriptor, field) in self.schema.bindings() {
            if !record.is_query_key(descriptor) {
                continue;
            }
            let Some(value) = record.get(&descriptor.name) else {
                continue;
            };

            let term = key_term(field, value);
            debug!(field = %descriptor.name, term = ?term, "Key equality clause");

            let query: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
            clauses.push(with_boost(descriptor, query));
        }
        clauses
    }

    /// Parse the rendered filter, or `None` for an empty filter.
    ///
    /// Parse failures are returned as is.
    pub fn filter_query(&self, filter: &FilterExpression) -> Result<Option<Box<dyn Query>>, IndexError> {
        if filter.is_empty() {
            return Ok(None);
        }

        let text = render_filter(filter);
        debug!(filter = %text, "Rendered filter text");

        let mut parser = QueryParser::for_index(self.index, self.default_fields());
        for (field, boost) in self.schema.boosts() {
            parser.set_field_boost(field, boost);
        }
        let query = parser.parse_query(&text)?;
        Ok(Some(query))
    }

    /// Key equality AND filter.
    pub fn build(&self, record: &Record, filter: &FilterExpression) -> Result<Box<dyn Query>, IndexError> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = self
            .key_clauses(record)
            .into_iter()
            .map(|q| (Occur::Must, q))
            .collect();

        if let Some(filter_query) = self.filter_query(filter)? {
            clauses.push((Occur::Must, filter_query));
        }

        if clauses.is_empty() {
            debug!(table = %self.schema.record_schema().table_name, "Unconstrained query, matching all");
            return Ok(Box::new(AllQuery));
        }

        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Query selecting the documents a write replaces or removes.
    ///
    /// `None` when the record has no populated query keys: writes never
    /// delete by an unconstrained query.
    pub fn delete_query(&self, record: &Record) -> Option<Box<dyn Query>> {
        let clauses = self.key_clauses(record);
        if clauses.is_empty() {
            return None;
        }
        Some(Box::new(BooleanQuery::new(
            clauses.into_iter().map(|q| (Occur::Must, q)).collect(),
        )))
    }

    /// Text-backed primary key fields; bare words in filter text search these.
    fn default_fields(&self) -> Vec<Field> {
        self.schema
            .bindings()
            .filter(|(descriptor, _)| descriptor.primary_key && !descriptor.field_type.is_numeric())
            .map(|(_, field)| field)
            .collect()
    }
}

/// Exact term for a key value: numbers as numbers, everything else as
/// lowercased canonical text.
fn key_term(field: Field, value: &FieldValue) -> Term {
    match value {
        FieldValue::Int32(v) => Term::from_field_i64(field, i64::from(*v)),
        FieldValue::Int64(v) => Term::from_field_i64(field, *v),
        FieldValue::Float64(v) => Term::from_field_f64(field, *v),
        other => Term::from_field_text(field, &encode_text(other).to_lowercase()),
    }
}

fn with_boost(descriptor: &FieldDescriptor, query: Box<dyn Query>) -> Box<dyn Query> {
    match descriptor.boost_value() {
        Some(boost) if boost != 1.0 => Box::new(BoostQuery::new(query, boost)),
        _ => query,
    }
}
