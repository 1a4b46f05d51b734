//! Entry point for record storage and search.
//!
//! A [`DataContext`] owns one index root: the searcher cache and the shared
//! compaction tracker. It is `Send + Sync`; share it behind an `Arc`.

use std::path::PathBuf;

use tracing::info;

use tabsearch_types::{FilterExpression, Record, Settings};

use crate::compaction::CompactionPolicy;
use crate::directory::IndexDirectoryManager;
use crate::error::IndexError;
use crate::searcher::{search, PageRequest, SearchPage};
use crate::writer::{WriteCoordinator, WriteReport};

/// Default writer memory budget in megabytes.
pub const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// Record storage and search over per-partition indices under one root.
pub struct DataContext {
    dirs: IndexDirectoryManager,
    writes: WriteCoordinator,
}

impl DataContext {
    /// Context over `root` with the default compaction policy.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_policy(root, CompactionPolicy::default())
    }

    pub fn with_policy(root: impl Into<PathBuf>, policy: CompactionPolicy) -> Self {
        Self::build(root.into(), DEFAULT_WRITER_MEMORY_MB, policy)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::build(
            settings.expanded_index_root(),
            settings.writer_memory_mb,
            CompactionPolicy::from_settings(&settings.compaction),
        )
    }

    fn build(root: PathBuf, writer_memory_mb: usize, policy: CompactionPolicy) -> Self {
        info!(
            root = ?root,
            writer_memory_mb,
            write_threshold = policy.write_threshold,
            interval_secs = policy.interval.as_secs(),
            "Opening data context"
        );
        Self {
            dirs: IndexDirectoryManager::new(root, writer_memory_mb),
            writes: WriteCoordinator::new(policy),
        }
    }

    pub fn directories(&self) -> &IndexDirectoryManager {
        &self.dirs
    }

    /// Insert records. Returns the number of records attempted.
    pub fn insert(&self, records: &[Record]) -> Result<usize, IndexError> {
        Ok(self.insert_counted(records)?.attempted)
    }

    /// Replace records matched by their query keys. Returns the number of
    /// records attempted, not the number of documents replaced.
    pub fn update(&self, records: &[Record]) -> Result<usize, IndexError> {
        Ok(self.update_counted(records)?.attempted)
    }

    /// Delete records matched by their query keys. Returns the number of
    /// records attempted, not the number of documents removed.
    pub fn delete(&self, records: &[Record]) -> Result<usize, IndexError> {
        Ok(self.delete_counted(records)?.attempted)
    }

    pub fn insert_counted(&self, records: &[Record]) -> Result<WriteReport, IndexError> {
        self.writes.insert(&self.dirs, records)
    }

    pub fn update_counted(&self, records: &[Record]) -> Result<WriteReport, IndexError> {
        self.writes.update(&self.dirs, records)
    }

    pub fn delete_counted(&self, records: &[Record]) -> Result<WriteReport, IndexError> {
        self.writes.delete(&self.dirs, records)
    }

    /// Search the template's partition.
    ///
    /// Populated query-key fields of `template` must match exactly; `filter`
    /// must match as well. `total` on the result counts the rows on this
    /// page; `matched` counts every hit.
    pub fn select(
        &self,
        template: &Record,
        filter: &FilterExpression,
        page: PageRequest,
        sort: Option<&str>,
    ) -> Result<SearchPage, IndexError> {
        search(&self.dirs, template, filter, page, sort)
    }

    pub fn select_all(&self, _template: &Record) -> Result<Vec<Record>, IndexError> {
        Err(IndexError::NotImplemented("select_all"))
    }

    pub fn select_count(&self, _template: &Record, _filter: &FilterExpression) -> Result<u64, IndexError> {
        Err(IndexError::NotImplemented("select_count"))
    }

    pub fn stream_save(&self, _template: &Record, _bytes: &[u8]) -> Result<(), IndexError> {
        Err(IndexError::NotImplemented("stream_save"))
    }

    pub fn stream_open(&self, _template: &Record) -> Result<Vec<u8>, IndexError> {
        Err(IndexError::NotImplemented("stream_open"))
    }

    pub fn stream_delete(&self, _template: &Record) -> Result<(), IndexError> {
        Err(IndexError::NotImplemented("stream_delete"))
    }

    pub fn stream_url(&self, _template: &Record) -> Result<String, IndexError> {
        Err(IndexError::NotImplemented("stream_url"))
    }

    /// Merge the template partition's segments now. Returns false when the
    /// partition has no index.
    pub fn compact(&self, template: &Record) -> Result<bool, IndexError> {
        self.writes.compact(&self.dirs, template)
    }

    /// Compaction passes triggered by writes so far.
    pub fn compactions(&self) -> Result<u64, IndexError> {
        self.writes.tracker().compactions()
    }

    /// Successful writes counted so far.
    pub fn write_count(&self) -> Result<u64, IndexError> {
        self.writes.tracker().writes()
    }
}
