//! SSTable writer — builds a [`Table`] from a frozen memtable or from
//! the concatenated records of several runs being merged.
//!
//! # Input Requirements
//!
//! - [`SstWriter::build_from_memtable`] takes the tree's in-order
//!   snapshot, which is sorted and duplicate-free by construction, and
//!   stamps every record with the current wall clock.
//! - [`SstWriter::build_from_records`] accepts records in any order with
//!   duplicate keys allowed. It stable-sorts by key and folds each run of
//!   equal keys into a single survivor: the newest `written_at` supplies
//!   value and timestamp (ties go to the later element, i.e. the newer
//!   input run), and the tombstone flag is the OR across the run — a
//!   deletion at any version sticks.
//!
//! # Output
//!
//! An in-memory [`Table`] whose record stream, sparse index, and trailer
//! are final; [`Table::write`](super::Table::write) persists it
//! atomically via a temporary file and rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::{DEFAULT_SPARSE_INDEX_STRIDE, DEFAULT_TRAILER_WINDOW};
use crate::memtable::RbTree;
use crate::util::compact_adjacent;

use super::{FileIndex, KeyRange, Record, SparseEntry, Table, TableError};

/// Builds SSTables for a target path.
///
/// ```rust,no_run
/// use stratadb::sstable::SstWriter;
/// # let tree = stratadb::memtable::RbTree::new(0);
/// let table = SstWriter::new("/tmp/layer_0_1")
///     .stride(4)
///     .build_from_memtable(&tree)
///     .unwrap();
/// table.write().unwrap();
/// ```
pub struct SstWriter {
    path: PathBuf,
    stride: usize,
    trailer_window: usize,
}

impl SstWriter {
    /// Creates a writer targeting `path` with default stride and trailer
    /// window.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stride: DEFAULT_SPARSE_INDEX_STRIDE,
            trailer_window: DEFAULT_TRAILER_WINDOW,
        }
    }

    /// Sets the sparse-index stride (entries per S records; minimum 1).
    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Sets the trailer discovery window the built trailer must fit in.
    pub fn trailer_window(mut self, window: usize) -> Self {
        self.trailer_window = window;
        self
    }

    /// Flush build: materializes the frozen tree's in-order records with
    /// current timestamps.
    pub fn build_from_memtable(&self, tree: &RbTree) -> Result<Table, TableError> {
        let written_at = current_timestamp();
        let records: Vec<Record> = tree
            .in_order()
            .map(|entry| Record {
                key: entry.key.to_owned(),
                value: entry.value.to_owned(),
                written_at,
                tombstone: entry.tombstone,
            })
            .collect();
        self.assemble(records)
    }

    /// Merge build: last-writer-wins compaction of records gathered from
    /// several input runs.
    pub fn build_from_records(&self, mut records: Vec<Record>) -> Result<Table, TableError> {
        // Stable sort keeps equal keys in input order, so within a run of
        // duplicates the newer input run comes last.
        records.sort_by(|a, b| a.key.cmp(&b.key));
        compact_adjacent(&mut records, |survivor, candidate| {
            if survivor.key != candidate.key {
                return false;
            }
            if candidate.written_at >= survivor.written_at {
                survivor.value = candidate.value.clone();
                survivor.written_at = candidate.written_at;
            }
            survivor.tombstone |= candidate.tombstone;
            true
        });
        self.assemble(records)
    }

    /// Serializes a sorted, duplicate-free record sequence into a table:
    /// record stream, one sparse-index entry per stride (starting at
    /// record 0), and the trailer.
    fn assemble(&self, records: Vec<Record>) -> Result<Table, TableError> {
        if records.is_empty() {
            return Err(TableError::Empty);
        }

        let mut data = Vec::new();
        let mut sparse_index = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            let bytes = serde_json::to_vec(record)?;
            if i % self.stride == 0 {
                sparse_index.insert(
                    record.key.clone(),
                    SparseEntry {
                        start: data.len(),
                        len: bytes.len(),
                    },
                );
            }
            data.extend_from_slice(&bytes);
        }

        let data_len = data.len();
        let index_len = serde_json::to_vec(&sparse_index)?.len();
        let file_index = FileIndex {
            data_start: 0,
            data_len,
            index_start: data_len,
            index_len,
            min_max: KeyRange {
                start_key: records[0].key.clone(),
                end_key: records[records.len() - 1].key.clone(),
            },
        };

        let trailer_len = serde_json::to_vec(&file_index)?.len();
        if trailer_len >= self.trailer_window {
            return Err(TableError::TrailerTooLarge {
                size: trailer_len,
                window: self.trailer_window,
            });
        }

        debug!(
            path = %self.path.display(),
            records = records.len(),
            index_entries = sparse_index.len(),
            data_len,
            "table assembled"
        );

        Ok(Table {
            data,
            sparse_index,
            file_index,
            path: self.path.clone(),
        })
    }
}

/// Current wall clock in nanoseconds since the UNIX epoch. Orders record
/// versions across flushes; within one build all records share a stamp.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_nanos() as u64
}
