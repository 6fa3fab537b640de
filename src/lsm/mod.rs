//! # LSM Manager Module
//!
//! Owns the on-disk shape of the store: an ordered collection of levels
//! of sorted runs. Level 0 holds up to K runs, one per memtable flush,
//! with overlapping key ranges permitted; levels ≥ 1 hold runs with
//! disjoint key ranges produced by merging.
//!
//! ## Layout and naming
//!
//! Every run is a single file named `layer_{level}_{ordinal}` inside
//! `data_dir`; ordinals start at 1 per level, so a lexicographic sort of
//! file names recovers flush/merge order. Reconstruction on open scans
//! the directory, sorts the names, opens each table's trailer and sparse
//! index only, and partitions by the encoded level.
//!
//! ## Flush and compaction
//!
//! [`LsmTree::insert_memtable`] materializes a frozen memtable as the
//! next Level-0 run. When Level-0 is at capacity, all of its runs (plus
//! any existing Level-1 data) are first merged into a single Level-1 run
//! with last-writer-wins semantics; tombstones are retained so deeper
//! data cannot resurrect.
//!
//! The merged run is staged in `compaction_dir` and renamed into
//! `data_dir` **before** the superseded inputs are removed, so an
//! interrupted compaction leaves either the pre-state or the post-state
//! readable — never a gap. Leftover duplicates read correctly because
//! Level-0 is probed before Level-1. `compaction_dir` must live on the
//! same filesystem as `data_dir` for the rename.
//!
//! Flushes and compactions are serialized: the engine holds the single
//! mutable reference to this manager, and a flush (including any
//! compaction it triggers) completes before the next begins.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::memtable::RbTree;
use crate::sstable::{Record, SstWriter, Table, TableError};

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

const LAYER_PREFIX: &str = "layer_";

/// Name of the staged merge output inside `compaction_dir`.
const STAGING_NAME: &str = "layer_0";

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by LSM manager operations.
#[derive(Debug, Error)]
pub enum LsmError {
    /// Underlying filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A table failed to build, open, or read.
    #[error("table error: {0}")]
    Table(#[from] TableError),
}

// ------------------------------------------------------------------------------------------------
// LsmTree
// ------------------------------------------------------------------------------------------------

/// The level manager: owns every sorted run and the directories they
/// live in.
pub struct LsmTree {
    /// Level-0 runs in flush order (oldest first); key ranges may
    /// overlap.
    level0: Vec<Table>,

    /// Levels ≥ 1: `layers[i]` holds level `i + 1`. Runs within one
    /// level have disjoint key ranges.
    layers: Vec<Vec<Table>>,

    config: DbConfig,
}

impl LsmTree {
    /// Opens the manager, creating `data_dir`/`compaction_dir` if needed
    /// and reconstructing the level structure from the files on disk.
    ///
    /// Files that do not parse as `layer_{level}_{ordinal}` (stray
    /// temporaries from an interrupted write, for instance) are skipped
    /// with a warning.
    pub fn open(config: DbConfig) -> Result<Self, LsmError> {
        fs::create_dir_all(&config.data_dir)?;
        fs::create_dir_all(&config.compaction_dir)?;

        let mut names = Vec::new();
        for entry in fs::read_dir(&config.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!(?name, "skipping non-UTF-8 file name in data dir"),
            }
        }
        // Lexicographic order recovers flush/merge order within a level.
        names.sort();

        let mut level0 = Vec::new();
        let mut layers: Vec<Vec<Table>> = Vec::new();
        for name in names {
            let Some((level, _ordinal)) = parse_layer_name(&name) else {
                warn!(name, "skipping unrecognized file in data dir");
                continue;
            };
            let table = Table::open(config.data_dir.join(&name), config.trailer_window)?;
            if level == 0 {
                level0.push(table);
            } else {
                if layers.len() < level {
                    layers.resize_with(level, Vec::new);
                }
                layers[level - 1].push(table);
            }
        }

        info!(
            data_dir = %config.data_dir.display(),
            level0 = level0.len(),
            deeper_levels = layers.len(),
            "lsm tree reconstructed"
        );

        Ok(Self {
            level0,
            layers,
            config,
        })
    }

    /// Number of runs in `level` (0-based; level 0 is the flush level).
    pub fn level_len(&self, level: usize) -> usize {
        if level == 0 {
            self.level0.len()
        } else {
            self.layers.get(level - 1).map_or(0, Vec::len)
        }
    }

    /// Materializes a frozen memtable as the next Level-0 run,
    /// compacting first when Level-0 is at capacity.
    ///
    /// Empty trees are ignored — there is nothing to persist.
    pub fn insert_memtable(&mut self, tree: RbTree) -> Result<(), LsmError> {
        if tree.is_empty() {
            debug!("skipping flush of empty memtable");
            return Ok(());
        }

        if self.level0.len() >= self.config.level0_capacity {
            self.compact()?;
        }

        let ordinal = self.level0.len() + 1;
        let path = self
            .config
            .data_dir
            .join(format!("{LAYER_PREFIX}0_{ordinal}"));
        info!(path = %path.display(), records = tree.len(), "flushing memtable to level 0");

        let table = SstWriter::new(&path)
            .stride(self.config.sparse_index_stride)
            .trailer_window(self.config.trailer_window)
            .build_from_memtable(&tree)?;
        table.write()?;
        self.level0.push(table);
        Ok(())
    }

    /// Point lookup across the on-disk runs.
    ///
    /// Level-0 is probed newest flush first; deeper levels in ascending
    /// order, consulting only the run whose `[min_key, max_key]` covers
    /// the key. The first hit wins — older versions below are shadowed.
    /// Tombstone records are returned as-is; resolving them to "deleted"
    /// is the caller's decision.
    pub fn get(&self, key: &str) -> Result<Option<Record>, LsmError> {
        for table in self.level0.iter().rev() {
            if !table.covers(key) {
                continue;
            }
            if let Some(record) = table.get(key)? {
                return Ok(Some(record));
            }
        }

        for level in &self.layers {
            for table in level {
                if !table.covers(key) {
                    continue;
                }
                if let Some(record) = table.get(key)? {
                    return Ok(Some(record));
                }
            }
        }

        Ok(None)
    }

    /// Merges every Level-0 run — and any existing Level-1 data — into a
    /// single Level-1 run.
    ///
    /// Inputs are gathered oldest-first (Level-1, then Level-0 in flush
    /// order) so the merge build's stable sort leaves the newest version
    /// last within every equal-key run. The staged output is renamed
    /// into `data_dir` before any input file is removed.
    fn compact(&mut self) -> Result<(), LsmError> {
        info!(level0 = self.level0.len(), "compacting level 0 into level 1");

        let mut records: Vec<Record> = Vec::new();
        if let Some(level1) = self.layers.first() {
            for table in level1 {
                records.extend(table.get_all()?);
            }
        }
        for table in &self.level0 {
            records.extend(table.get_all()?);
        }

        let staging = self.config.compaction_dir.join(STAGING_NAME);
        let mut merged = SstWriter::new(&staging)
            .stride(self.config.sparse_index_stride)
            .trailer_window(self.config.trailer_window)
            .build_from_records(records)?;
        merged.write()?;

        // Promote before deleting inputs: from here on the merged run is
        // durable under its final name, and stray Level-0 leftovers only
        // shadow it with identical-or-newer data.
        let dest = self.config.data_dir.join(format!("{LAYER_PREFIX}1_1"));
        fs::rename(&staging, &dest)?;
        merged.set_path(dest.clone());

        for table in self.level0.drain(..) {
            remove_run(table.path());
        }
        if let Some(level1) = self.layers.first_mut() {
            for table in level1.drain(..) {
                // The previous layer_1_1 was already replaced by the rename.
                if table.path() != dest {
                    remove_run(table.path());
                }
            }
        }

        if self.layers.is_empty() {
            self.layers.push(Vec::new());
        }
        self.layers[0].push(merged);

        info!(path = %dest.display(), "compaction complete");
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

/// Decodes `layer_{level}_{ordinal}` into `(level, ordinal)`.
fn parse_layer_name(name: &str) -> Option<(usize, usize)> {
    let rest = name.strip_prefix(LAYER_PREFIX)?;
    let (level, ordinal) = rest.split_once('_')?;
    Some((level.parse().ok()?, ordinal.parse().ok()?))
}

/// Removes a superseded run, warning instead of failing: the new state
/// is already durable, and a leftover file is reconciled on the next
/// reconstruction.
fn remove_run(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        warn!(path = %path.display(), %error, "failed to remove superseded run");
    }
}
