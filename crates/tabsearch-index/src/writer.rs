//! Insert, update and delete under scoped writers.
//!
//! Each record gets its own writer: open, mutate, commit, maybe compact,
//! close. The partition's cached searcher is evicted however the write ends.
//! Records in a batch are independent; a failure stops the batch but does
//! not undo records already committed.

use tantivy::collector::Count;
use tantivy::query::Query;
use tantivy::{Index, IndexReader, ReloadPolicy};
use tracing::{debug, info, warn};

use tabsearch_types::Record;

use crate::codec::record_to_doc;
use crate::compaction::{compact, CompactionPolicy, CompactionTracker};
use crate::directory::{IndexDirectoryManager, Partition};
use crate::error::IndexError;
use crate::query::QueryBuilder;

/// Outcome of a batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Records processed from the batch
    pub attempted: usize,
    /// Documents added to the index
    pub added: usize,
    /// Committed documents matched by delete queries
    pub deleted: usize,
}

impl WriteReport {
    fn absorb(&mut self, other: WriteReport) {
        self.attempted += other.attempted;
        self.added += other.added;
        self.deleted += other.deleted;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl WriteKind {
    fn as_str(&self) -> &'static str {
        match self {
            WriteKind::Insert => "insert",
            WriteKind::Update => "update",
            WriteKind::Delete => "delete",
        }
    }
}

/// Applies writes and drives deferred compaction.
pub struct WriteCoordinator {
    tracker: CompactionTracker,
}

impl WriteCoordinator {
    pub fn new(policy: CompactionPolicy) -> Self {
        Self {
            tracker: CompactionTracker::new(policy),
        }
    }

    pub fn tracker(&self) -> &CompactionTracker {
        &self.tracker
    }

    /// Add each record as a new document.
    pub fn insert(&self, dirs: &IndexDirectoryManager, records: &[Record]) -> Result<WriteReport, IndexError> {
        self.apply_batch(dirs, records, WriteKind::Insert)
    }

    /// Replace the documents matching each record's query keys with the
    /// record. With no match this is an insert.
    pub fn update(&self, dirs: &IndexDirectoryManager, records: &[Record]) -> Result<WriteReport, IndexError> {
        self.apply_batch(dirs, records, WriteKind::Update)
    }

    /// Remove the documents matching each record's query keys.
    pub fn delete(&self, dirs: &IndexDirectoryManager, records: &[Record]) -> Result<WriteReport, IndexError> {
        self.apply_batch(dirs, records, WriteKind::Delete)
    }

    /// Compact the record's partition now. Returns false if it has no index.
    pub fn compact(&self, dirs: &IndexDirectoryManager, record: &Record) -> Result<bool, IndexError> {
        let partition = Partition::for_record(record)?;
        let path = dirs.resolve(&partition)?;
        if !IndexDirectoryManager::has_index(&path) {
            debug!(path = ?path, "No index to compact");
            return Ok(false);
        }

        let _eviction = dirs.eviction_guard(&path);
        let (index, _schema) = dirs.open_existing(&path, record.schema())?;
        let mut writer = dirs.writer(&index)?;
        compact(&index, &mut writer)?;
        writer.wait_merging_threads()?;
        Ok(true)
    }

    fn apply_batch(
        &self,
        dirs: &IndexDirectoryManager,
        records: &[Record],
        kind: WriteKind,
    ) -> Result<WriteReport, IndexError> {
        let mut report = WriteReport::default();
        for record in records {
            report.absorb(self.apply(dirs, record, kind)?);
        }

        info!(
            op = kind.as_str(),
            attempted = report.attempted,
            added = report.added,
            deleted = report.deleted,
            "Write batch complete"
        );
        Ok(report)
    }

    fn apply(
        &self,
        dirs: &IndexDirectoryManager,
        record: &Record,
        kind: WriteKind,
    ) -> Result<WriteReport, IndexError> {
        let partition = Partition::for_record(record)?;
        let path = dirs.resolve(&partition)?;
        let _eviction = dirs.eviction_guard(&path);

        let (index, schema) = dirs.open_or_create(&path, record.schema())?;

        let delete_query = match kind {
            WriteKind::Insert => None,
            WriteKind::Update | WriteKind::Delete => {
                let query = QueryBuilder::new(&index, &schema).delete_query(record);
                if query.is_none() {
                    warn!(
                        op = kind.as_str(),
                        table = %partition.table_name(),
                        "Record has no populated query keys, nothing deleted"
                    );
                }
                query
            }
        };

        let deleted = match &delete_query {
            Some(query) => count_committed(&index, query.as_ref())?,
            None => 0,
        };

        let mut writer = dirs.writer(&index)?;
        if let Some(query) = delete_query {
            writer.delete_query(query)?;
        }
        let added = if kind == WriteKind::Delete {
            0
        } else {
            writer.add_document(record_to_doc(&schema, record))?;
            1
        };
        writer.commit()?;

        if self.tracker.record_write()? {
            compact(&index, &mut writer)?;
        }
        writer.wait_merging_threads()?;

        debug!(
            op = kind.as_str(),
            storage_key = %partition.storage_key(),
            table = %partition.table_name(),
            added,
            deleted,
            "Committed write"
        );
        Ok(WriteReport {
            attempted: 1,
            added,
            deleted,
        })
    }
}

/// Documents matching a query in the last committed state.
fn count_committed(index: &Index, query: &dyn Query) -> Result<usize, IndexError> {
    let reader: IndexReader = index
        .reader_builder()
        .reload_policy(ReloadPolicy::Manual)
        .try_into()?;
    Ok(reader.searcher().search(query, &Count)?)
}
