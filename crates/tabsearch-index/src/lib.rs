//! # tabsearch-index
//!
//! Stores typed records in Tantivy full-text indices, one index per storage
//! key and table, and finds them again by key equality plus a free-form
//! filter.
//!
//! ## Features
//! - Index schema derived from the declared record schema
//! - Exact, case-insensitive key matching; word and phrase filters
//! - Scoped writers with searcher cache invalidation after every write
//! - Deferred segment compaction by write count or elapsed time
//! - Paged, relevance-ordered search with per-record scores
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tabsearch_index::{DataContext, PageRequest};
//! use tabsearch_types::{FieldDescriptor, FieldType, FilterExpression, Record, RecordSchema};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(
//!     RecordSchema::new("orders", "tenant")
//!         .with_field(FieldDescriptor::new("tenant", FieldType::ShortText))
//!         .with_field(FieldDescriptor::new("id", FieldType::Int64).primary_key())
//!         .with_field(FieldDescriptor::new("notes", FieldType::LongText)),
//! );
//!
//! let context = DataContext::new("/tmp/tabsearch");
//! let order = Record::new(schema.clone())
//!     .with("tenant", "acme")?
//!     .with("id", 42i64)?
//!     .with("notes", "rush delivery")?;
//! context.insert(&[order])?;
//!
//! let template = Record::new(schema).with("tenant", "acme")?;
//! let filter = FilterExpression::new().condition("notes", "=", "rush");
//! let page = context.select(&template, &filter, PageRequest::new(1, 20), None)?;
//! assert_eq!(page.total, 1);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod compaction;
pub mod context;
pub mod directory;
pub mod error;
pub mod filter;
pub mod query;
pub mod schema;
pub mod searcher;
pub mod writer;

pub use codec::{decode_text, doc_to_record, encode_text, record_to_doc};
pub use compaction::{compact, CompactionPolicy, CompactionTracker};
pub use context::{DataContext, DEFAULT_WRITER_MEMORY_MB};
pub use directory::{IndexDirectoryManager, Partition};
pub use error::IndexError;
pub use filter::{render_condition, render_filter, typed_condition};
pub use query::QueryBuilder;
pub use schema::{register_tokenizers, IndexSchema};
pub use searcher::{search, PageRequest, SearchPage};
pub use writer::{WriteCoordinator, WriteReport};
