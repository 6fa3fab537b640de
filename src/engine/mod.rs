//! # Engine Façade
//!
//! Wires the write path (cache → memtable → LSM manager) and the read
//! path (cache → memtable → Level-0 → deeper levels) into a single
//! [`Db`] handle.
//!
//! ## Write flow
//!
//! `put` lands in the hot cache. When the cache reaches capacity its
//! snapshot is swapped out and drained into the memtable; when the
//! memtable reports [`CapacityExceeded`] it is swapped for a fresh empty
//! tree and the frozen tree is handed to the LSM manager, which
//! materializes it as a Level-0 run (compacting Level-0 first when it is
//! full). `delete` removes any cached value and buffers a tombstone.
//!
//! ## Read flow
//!
//! `get` consults the cache (newest), then the memtable — where a
//! tombstone resolves to "not found" and stops the descent — then the
//! on-disk levels, newest to oldest.
//!
//! ## Ownership and concurrency
//!
//! The engine is the single owner: it holds the only mutable reference
//! to the LSM manager, and flushes (with any compaction they trigger)
//! run to completion before the next write proceeds. The memtable's swap
//! mutex and the cache's map mutex are the only locks in the system.
//!
//! [`CapacityExceeded`]: crate::memtable::MemtableError::CapacityExceeded

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use thiserror::Error;
use tracing::{info, trace};

use crate::cache::Cache;
use crate::config::DbConfig;
use crate::lsm::{LsmError, LsmTree};
use crate::memtable::{Memtable, MemtableError, MemtableGetResult};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors surfaced by [`Db`] operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Error originating from the memtable.
    #[error("memtable error: {0}")]
    Memtable(#[from] MemtableError),

    /// Error originating from the LSM manager or a sorted run.
    #[error("lsm error: {0}")]
    Lsm(#[from] LsmError),
}

// ------------------------------------------------------------------------------------------------
// Stats
// ------------------------------------------------------------------------------------------------

/// Snapshot of engine occupancy returned by [`Db::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbStats {
    /// Entries currently absorbed by the hot cache.
    pub cached_entries: usize,
    /// Live records buffered in the active memtable.
    pub buffered_records: usize,
    /// Sorted runs in Level-0.
    pub level0_runs: usize,
    /// Sorted runs in Level-1.
    pub level1_runs: usize,
}

// ------------------------------------------------------------------------------------------------
// Db
// ------------------------------------------------------------------------------------------------

/// The storage engine handle.
pub struct Db {
    cache: Cache,
    memtable: Memtable,
    lsm: LsmTree,
}

impl Db {
    /// Opens (or creates) a database described by `config`.
    ///
    /// The data and compaction directories are created if missing, and
    /// the level structure is reconstructed from the runs on disk.
    pub fn open(config: DbConfig) -> Result<Self, DbError> {
        info!(data_dir = %config.data_dir.display(), "opening database");
        let cache = Cache::new(config.hot_cache_capacity);
        let memtable = Memtable::new(config.memtable_max_size);
        let lsm = LsmTree::open(config)?;
        Ok(Self {
            cache,
            memtable,
            lsm,
        })
    }

    /// Inserts or overwrites a key/value pair.
    pub fn put(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        if key.is_empty() {
            return Err(MemtableError::EmptyKey.into());
        }
        trace!(key, "put");

        self.cache.set(key, value);
        if self.cache.is_at_capacity() {
            self.drain_cache()?;
        }
        Ok(())
    }

    /// Point lookup. Returns `Ok(None)` for absent and deleted keys.
    pub fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        trace!(key, "get");

        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value));
        }

        match self.memtable.get(key)? {
            MemtableGetResult::Put(value) => return Ok(Some(value)),
            MemtableGetResult::Delete => return Ok(None),
            MemtableGetResult::NotFound => {}
        }

        match self.lsm.get(key)? {
            Some(record) if record.tombstone => Ok(None),
            Some(record) => Ok(Some(record.value)),
            None => Ok(None),
        }
    }

    /// Deletes a key by buffering a tombstone; older on-disk versions
    /// are suppressed at read time and dropped by compaction.
    pub fn delete(&mut self, key: &str) -> Result<(), DbError> {
        if key.is_empty() {
            return Err(MemtableError::EmptyKey.into());
        }
        trace!(key, "delete");

        self.cache.remove(key);
        self.buffer_entry(key, "", true)
    }

    /// Forces everything buffered in memory down to Level-0.
    pub fn flush(&mut self) -> Result<(), DbError> {
        self.drain_cache()?;
        let frozen = self.memtable.swap()?;
        self.lsm.insert_memtable(frozen)?;
        Ok(())
    }

    /// Flushes all buffered writes and consumes the handle.
    pub fn close(mut self) -> Result<(), DbError> {
        info!("closing database");
        self.flush()
    }

    /// Current occupancy of each layer.
    pub fn stats(&self) -> Result<DbStats, DbError> {
        Ok(DbStats {
            cached_entries: self.cache.len(),
            buffered_records: self.memtable.len()?,
            level0_runs: self.lsm.level_len(0),
            level1_runs: self.lsm.level_len(1),
        })
    }

    /// Moves the cache snapshot into the memtable, flushing the memtable
    /// whenever it reports capacity.
    fn drain_cache(&mut self) -> Result<(), DbError> {
        let snapshot = self.cache.swap();
        trace!(entries = snapshot.len(), "draining cache into memtable");
        for (key, value) in snapshot {
            self.buffer_entry(&key, &value, false)?;
        }
        Ok(())
    }

    /// Buffers one entry in the memtable; on capacity, swaps the frozen
    /// tree into the LSM manager and retries on the fresh tree.
    fn buffer_entry(&mut self, key: &str, value: &str, tombstone: bool) -> Result<(), DbError> {
        let insert = |memtable: &Memtable| {
            if tombstone {
                memtable.insert_tombstone(key)
            } else {
                memtable.insert(key, value)
            }
        };

        match insert(&self.memtable) {
            Ok(()) => Ok(()),
            Err(MemtableError::CapacityExceeded(_)) => {
                let frozen = self.memtable.swap()?;
                self.lsm.insert_memtable(frozen)?;
                insert(&self.memtable)?;
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }
}
