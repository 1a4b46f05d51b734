//! Deferred compaction.
//!
//! Every successful write bumps a shared counter. A compaction pass runs when
//! the counter reaches a multiple of the write threshold or when more than
//! the interval has passed since the previous pass.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tantivy::index::SegmentId;
use tantivy::{Index, IndexWriter};
use tracing::{debug, info};

use tabsearch_types::CompactionSettings;

use crate::error::IndexError;

/// Default write count between compactions.
pub const DEFAULT_WRITE_THRESHOLD: u64 = 100;

/// Default time between compactions.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// When to compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    /// Compact when the write count is a multiple of this. 0 disables.
    pub write_threshold: u64,
    /// Compact when strictly more than this elapsed since the last pass.
    pub interval: Duration,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            write_threshold: DEFAULT_WRITE_THRESHOLD,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl CompactionPolicy {
    pub fn new(write_threshold: u64, interval: Duration) -> Self {
        Self {
            write_threshold,
            interval,
        }
    }

    pub fn from_settings(settings: &CompactionSettings) -> Self {
        Self::new(settings.write_threshold, settings.interval())
    }

    /// Policy that never triggers on its own.
    pub fn disabled() -> Self {
        Self::new(0, Duration::MAX)
    }

    pub fn should_compact(&self, write_count: u64, since_last: Duration) -> bool {
        let by_count = self.write_threshold > 0 && write_count % self.write_threshold == 0;
        by_count || since_last > self.interval
    }
}

#[derive(Debug)]
struct TrackerState {
    writes: u64,
    compactions: u64,
    last_compaction: Instant,
}

/// Write counter and last-compaction time shared by all partitions of one
/// index root.
#[derive(Debug)]
pub struct CompactionTracker {
    policy: CompactionPolicy,
    state: Mutex<TrackerState>,
}

impl CompactionTracker {
    pub fn new(policy: CompactionPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(TrackerState {
                writes: 0,
                compactions: 0,
                last_compaction: Instant::now(),
            }),
        }
    }

    pub fn policy(&self) -> CompactionPolicy {
        self.policy
    }

    /// Count one successful write; returns true if a compaction is due.
    ///
    /// A due compaction resets the timer immediately, so concurrent writers
    /// do not both trigger a pass.
    pub fn record_write(&self) -> Result<bool, IndexError> {
        self.record_write_at(Instant::now())
    }

    pub(crate) fn record_write_at(&self, now: Instant) -> Result<bool, IndexError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;

        state.writes += 1;
        let since_last = now.saturating_duration_since(state.last_compaction);
        let due = self.policy.should_compact(state.writes, since_last);
        if due {
            state.last_compaction = now;
            state.compactions += 1;
            debug!(writes = state.writes, ?since_last, "Compaction due");
        }
        Ok(due)
    }

    /// Successful writes counted so far.
    pub fn writes(&self) -> Result<u64, IndexError> {
        let state = self
            .state
            .lock()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;
        Ok(state.writes)
    }

    /// Compaction passes triggered so far.
    pub fn compactions(&self) -> Result<u64, IndexError> {
        let state = self
            .state
            .lock()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;
        Ok(state.compactions)
    }

    #[cfg(test)]
    pub(crate) fn started_at(&self) -> Instant {
        self.state
            .lock()
            .map(|s| s.last_compaction)
            .unwrap_or_else(|e| e.into_inner().last_compaction)
    }
}

/// Merge all searchable segments of an index into one, dropping deleted
/// documents. A lone segment is rewritten only if it has deletes.
///
/// Failures are returned to the caller; there is no retry.
pub fn compact(index: &Index, writer: &mut IndexWriter) -> Result<(), IndexError> {
    let metas = index.searchable_segment_metas()?;
    let deleted: u32 = metas.iter().map(|meta| meta.num_deleted_docs()).sum();
    if metas.is_empty() || (metas.len() == 1 && deleted == 0) {
        debug!(segments = metas.len(), "Nothing to compact");
        return Ok(());
    }

    let segment_ids: Vec<SegmentId> = metas.iter().map(|meta| meta.id()).collect();
    writer.merge(&segment_ids).wait()?;
    info!(segments = segment_ids.len(), deleted, "Compacted index segments");
    Ok(())
}
