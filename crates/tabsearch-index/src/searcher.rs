//! Paged search over one partition.
//!
//! Hits come back in relevance order. The page's documents are decoded into
//! records carrying their score.

use std::time::Instant;

use tantivy::collector::{Count, TopDocs};
use tantivy::TantivyDocument;
use tracing::{debug, info, warn};

use tabsearch_types::{FilterExpression, Record};

use crate::codec::doc_to_record;
use crate::directory::{IndexDirectoryManager, Partition};
use crate::error::IndexError;
use crate::query::QueryBuilder;

/// Page of results to return. Paging applies only when both fields are
/// positive; otherwise every hit is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page_index: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_paged(&self) -> bool {
        self.page_index > 0 && self.page_size > 0
    }

    /// Offset of the first hit on the page.
    pub fn start(&self) -> usize {
        if self.is_paged() {
            (self.page_index - 1).saturating_mul(self.page_size)
        } else {
            0
        }
    }

    /// Hits to retrieve to cover the page, `None` when unbounded.
    pub fn bound(&self) -> Option<usize> {
        self.is_paged()
            .then(|| self.page_index.saturating_mul(self.page_size))
    }
}

/// One page of decoded hits.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub records: Vec<Record>,
    /// Rows decoded for this page
    pub total: usize,
    /// Size of the full matching set
    pub matched: usize,
}

/// Run a template-and-filter query against the template's partition.
///
/// A partition with no index yields an empty page. `sort` is accepted but
/// not applied.
pub fn search(
    dirs: &IndexDirectoryManager,
    template: &Record,
    filter: &FilterExpression,
    page: PageRequest,
    sort: Option<&str>,
) -> Result<SearchPage, IndexError> {
    let started = Instant::now();
    let partition = Partition::for_record(template)?;
    let path = dirs.resolve(&partition)?;

    if !IndexDirectoryManager::has_index(&path) {
        debug!(path = ?path, "No index in partition, empty result");
        return Ok(SearchPage::default());
    }
    if let Some(sort) = sort {
        warn!(sort, "Sort order is not applied");
    }

    let (searcher, schema) = dirs.searcher(&path, template.schema())?;
    let query = QueryBuilder::new(searcher.index(), &schema).build(template, filter)?;

    let doc_count = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
    let bound = page
        .bound()
        .map_or(doc_count, |bound| bound.min(doc_count))
        .max(1);

    let (top_docs, matched) = searcher.search(query.as_ref(), &(TopDocs::with_limit(bound), Count))?;

    let mut records = Vec::with_capacity(top_docs.len().saturating_sub(page.start()));
    for (score, address) in top_docs.into_iter().skip(page.start()) {
        let doc: TantivyDocument = searcher.doc(address)?;
        let mut record = doc_to_record(&schema, &doc)?;
        record.set_score(f64::from(score));
        records.push(record);
    }

    info!(
        table = %partition.table_name(),
        storage_key = %partition.storage_key(),
        rows = records.len(),
        matched,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Search complete"
    );

    Ok(SearchPage {
        total: records.len(),
        records,
        matched,
    })
}
