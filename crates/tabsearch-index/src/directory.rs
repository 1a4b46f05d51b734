//! Partition directories, index handles and the searcher cache.
//!
//! Layout: `<base>/<storage key>/<table name>/`, one Tantivy index each.
//! Searchers are cached per partition path and evicted after every write to
//! that partition, so a search following a write sees it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tantivy::directory::error::OpenReadError;
use tantivy::merge_policy::NoMergePolicy;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyError};
use tracing::{debug, info, warn};

use tabsearch_types::{Record, RecordSchema};

use crate::codec::encode_text;
use crate::error::IndexError;
use crate::schema::{register_tokenizers, IndexSchema};

/// File whose presence marks an initialized index.
pub const INDEX_META_FILE: &str = "meta.json";

const MB: usize = 1024 * 1024;

/// Opens tried before a missing segment file is reported.
const SEARCHER_OPEN_ATTEMPTS: usize = 3;

/// One independent index: a storage key and a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    storage_key: String,
    table_name: String,
}

impl Partition {
    pub fn new(storage_key: impl Into<String>, table_name: impl Into<String>) -> Result<Self, IndexError> {
        let storage_key = storage_key.into();
        let table_name = table_name.into();
        validate_component(&storage_key)?;
        validate_component(&table_name)?;
        Ok(Self {
            storage_key,
            table_name,
        })
    }

    /// Partition addressed by a record's storage key value and table.
    pub fn for_record(record: &Record) -> Result<Self, IndexError> {
        let schema = record.schema();
        let key = record
            .get(&schema.storage_key_field)
            .ok_or_else(|| IndexError::MissingStorageKey {
                table: schema.table_name.clone(),
                field: schema.storage_key_field.clone(),
            })?;
        Self::new(encode_text(key), schema.table_name.clone())
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.storage_key).join(&self.table_name)
    }
}

fn validate_component(component: &str) -> Result<(), IndexError> {
    let invalid = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(|c: char| matches!(c, '/' | '\\' | '\0'));
    if invalid {
        return Err(IndexError::InvalidPartition(component.to_string()));
    }
    Ok(())
}

/// Removes a partition's cached searcher when dropped.
pub(crate) struct SearcherEviction<'a> {
    manager: &'a IndexDirectoryManager,
    path: &'a Path,
}

impl Drop for SearcherEviction<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.manager.evict(self.path) {
            warn!(path = ?self.path, error = %e, "Failed to evict cached searcher");
        }
    }
}

/// Resolves partitions to directories and caches searchers.
pub struct IndexDirectoryManager {
    base_dir: PathBuf,
    writer_memory_mb: usize,
    searchers: Mutex<HashMap<PathBuf, Searcher>>,
}

impl IndexDirectoryManager {
    pub fn new(base_dir: impl Into<PathBuf>, writer_memory_mb: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            writer_memory_mb,
            searchers: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory of a partition, created if absent.
    pub fn resolve(&self, partition: &Partition) -> Result<PathBuf, IndexError> {
        let path = self.base_dir.join(partition.relative_path());
        if !path.is_dir() {
            std::fs::create_dir_all(&path)?;
            debug!(path = ?path, "Created partition directory");
        }
        Ok(path)
    }

    /// Check if an index has been written in a partition directory
    pub fn has_index(path: &Path) -> bool {
        path.join(INDEX_META_FILE).exists()
    }

    /// Open the partition's index, creating it from the record schema if
    /// none exists yet.
    pub fn open_or_create(
        &self,
        path: &Path,
        record_schema: &Arc<RecordSchema>,
    ) -> Result<(Index, IndexSchema), IndexError> {
        if Self::has_index(path) {
            return self.open_existing(path, record_schema);
        }

        let schema = IndexSchema::build(record_schema.clone())?;
        info!(path = ?path, table = %record_schema.table_name, "Creating new index");
        std::fs::create_dir_all(path)?;
        let index = Index::create_in_dir(path, schema.schema().clone())?;
        register_tokenizers(&index);
        Ok((index, schema))
    }

    /// Open an existing index and bind it to the record schema.
    pub fn open_existing(
        &self,
        path: &Path,
        record_schema: &Arc<RecordSchema>,
    ) -> Result<(Index, IndexSchema), IndexError> {
        debug!(path = ?path, "Opening existing index");
        let index = Index::open_in_dir(path)?;
        register_tokenizers(&index);
        let schema = IndexSchema::from_schema(record_schema.clone(), index.schema())?;
        Ok((index, schema))
    }

    /// Create a single-threaded writer with the configured memory budget.
    ///
    /// Background merging is off; segments are merged only by compaction.
    pub fn writer(&self, index: &Index) -> Result<IndexWriter, IndexError> {
        let writer: IndexWriter = index.writer_with_num_threads(1, self.writer_memory_mb * MB)?;
        writer.set_merge_policy(Box::new(NoMergePolicy));
        debug!(memory_mb = self.writer_memory_mb, "Created index writer");
        Ok(writer)
    }

    /// Cached searcher for a partition, opened from disk on a miss.
    pub fn searcher(
        &self,
        path: &Path,
        record_schema: &Arc<RecordSchema>,
    ) -> Result<(Searcher, IndexSchema), IndexError> {
        let mut searchers = self
            .searchers
            .lock()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;

        if let Some(searcher) = searchers.get(path) {
            debug!(path = ?path, "Using cached searcher");
            let schema = IndexSchema::from_schema(record_schema.clone(), searcher.schema().clone())?;
            return Ok((searcher.clone(), schema));
        }

        let mut attempt = 1;
        let (searcher, schema) = loop {
            match self.open_searcher(path, record_schema) {
                Err(IndexError::Tantivy(TantivyError::OpenReadError(
                    OpenReadError::FileDoesNotExist(file),
                ))) if attempt < SEARCHER_OPEN_ATTEMPTS => {
                    warn!(
                        path = ?path,
                        file = ?file,
                        attempt,
                        "Segment removed while opening, reopening"
                    );
                    attempt += 1;
                }
                opened => break opened?,
            }
        };
        searchers.insert(path.to_path_buf(), searcher.clone());
        info!(path = ?path, docs = searcher.num_docs(), "Opened searcher");
        Ok((searcher, schema))
    }

    /// Searcher over the last commit on disk. A compaction committing
    /// concurrently may remove segment files listed in the meta file read here.
    fn open_searcher(
        &self,
        path: &Path,
        record_schema: &Arc<RecordSchema>,
    ) -> Result<(Searcher, IndexSchema), IndexError> {
        let (index, schema) = self.open_existing(path, record_schema)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok((reader.searcher(), schema))
    }

    /// Drop a partition's cached searcher. Returns whether one was cached.
    pub fn evict(&self, path: &Path) -> Result<bool, IndexError> {
        let mut searchers = self
            .searchers
            .lock()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;
        let evicted = searchers.remove(path).is_some();
        if evicted {
            debug!(path = ?path, "Evicted cached searcher");
        }
        Ok(evicted)
    }

    /// Whether a searcher is cached for a partition path.
    pub fn is_cached(&self, path: &Path) -> Result<bool, IndexError> {
        let searchers = self
            .searchers
            .lock()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;
        Ok(searchers.contains_key(path))
    }

    /// Guard that evicts the partition's searcher on every exit path.
    pub(crate) fn eviction_guard<'a>(&'a self, path: &'a Path) -> SearcherEviction<'a> {
        SearcherEviction {
            manager: self,
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsearch_types::{FieldDescriptor, FieldType};
    use tempfile::TempDir;

    fn notes() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::new("notes", "owner")
                .with_field(FieldDescriptor::new("owner", FieldType::ShortText))
                .with_field(FieldDescriptor::new("id", FieldType::Int64).primary_key())
                .with_field(FieldDescriptor::new("body", FieldType::LongText)),
        )
    }

    #[test]
    fn test_resolve_creates_directories_idempotently() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexDirectoryManager::new(temp_dir.path(), 50);
        let partition = Partition::new("tenant-a", "notes").unwrap();

        let first = manager.resolve(&partition).unwrap();
        let second = manager.resolve(&partition).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, temp_dir.path().join("tenant-a").join("notes"));
        assert!(first.is_dir());
        assert!(!IndexDirectoryManager::has_index(&first));
    }

    #[test]
    fn test_partition_for_record() {
        let record = Record::new(notes()).with("owner", "alice").unwrap();
        let partition = Partition::for_record(&record).unwrap();
        assert_eq!(partition.storage_key(), "alice");
        assert_eq!(partition.table_name(), "notes");

        let keyless = Record::new(notes());
        assert!(matches!(
            Partition::for_record(&keyless),
            Err(IndexError::MissingStorageKey { .. })
        ));
    }

    #[test]
    fn test_partition_rejects_path_components() {
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(
                matches!(Partition::new(bad, "notes"), Err(IndexError::InvalidPartition(_))),
                "accepted {:?}",
                bad
            );
        }
        assert!(Partition::new("ok", "..").is_err());
    }

    #[test]
    fn test_open_or_create_then_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexDirectoryManager::new(temp_dir.path(), 50);
        let path = manager
            .resolve(&Partition::new("alice", "notes").unwrap())
            .unwrap();

        let (index, schema) = manager.open_or_create(&path, &notes()).unwrap();
        assert!(IndexDirectoryManager::has_index(&path));
        let _writer = manager.writer(&index).unwrap();
        drop(_writer);

        let (_index, reopened) = manager.open_or_create(&path, &notes()).unwrap();
        assert_eq!(reopened.field("body"), schema.field("body"));
    }

    #[test]
    fn test_reopen_with_incompatible_schema() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexDirectoryManager::new(temp_dir.path(), 50);
        let path = manager
            .resolve(&Partition::new("alice", "notes").unwrap())
            .unwrap();
        manager.open_or_create(&path, &notes()).unwrap();

        let changed = Arc::new(
            (*notes())
                .clone()
                .with_field(FieldDescriptor::new("extra", FieldType::Bool)),
        );
        assert!(matches!(
            manager.open_existing(&path, &changed),
            Err(IndexError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_searcher_cache_and_eviction() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexDirectoryManager::new(temp_dir.path(), 50);
        let path = manager
            .resolve(&Partition::new("alice", "notes").unwrap())
            .unwrap();
        let (index, _) = manager.open_or_create(&path, &notes()).unwrap();
        let mut writer = manager.writer(&index).unwrap();
        writer.commit().unwrap();
        drop(writer);

        assert!(!manager.is_cached(&path).unwrap());
        manager.searcher(&path, &notes()).unwrap();
        assert!(manager.is_cached(&path).unwrap());

        {
            let _guard = manager.eviction_guard(&path);
        }
        assert!(!manager.is_cached(&path).unwrap());
        assert!(!manager.evict(&path).unwrap());
    }
}
