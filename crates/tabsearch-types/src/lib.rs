//! # tabsearch-types
//!
//! Shared domain types for tabsearch.
//!
//! This crate defines the record model the index adapter works against:
//! - Field types and values: the closed set of supported type tags
//! - Record schemas: ordered field descriptors plus table and storage key
//! - Records: typed values bound to one schema
//! - Filter expressions: grouping markers, combinators and conditions
//! - Settings: configuration types
//!
//! ## Usage
//!
//! ```rust
//! use tabsearch_types::{FieldDescriptor, FieldType, Record, RecordSchema};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(
//!     RecordSchema::new("contacts", "tenant")
//!         .with_field(FieldDescriptor::new("tenant", FieldType::ShortText))
//!         .with_field(FieldDescriptor::new("id", FieldType::Int64).primary_key()),
//! );
//! let record = Record::new(schema).with("tenant", "acme").unwrap();
//! assert!(record.get("tenant").is_some());
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod filter;
pub mod record;
pub mod schema;

pub use config::{CompactionSettings, Settings};
pub use error::TypesError;
pub use field::{FieldType, FieldValue};
pub use filter::{FilterCondition, FilterExpression, FilterToken};
pub use record::{Record, QUERY_KEYS_JSON_KEY, SCORE_JSON_KEY};
pub use schema::{FieldDescriptor, RecordSchema};
