//! Engine configuration.
//!
//! All tunables live in a single [`DbConfig`] struct handed to
//! [`Db::open`](crate::Db::open). Every field has a sensible default, so
//! callers typically override only the directories:
//!
//! ```rust
//! use stratadb::DbConfig;
//!
//! let config = DbConfig {
//!     data_dir: "/tmp/stratadb/data".into(),
//!     compaction_dir: "/tmp/stratadb/compaction".into(),
//!     ..DbConfig::default()
//! };
//! ```

use std::path::PathBuf;

/// Max Level-0 runs before compaction triggers.
pub const DEFAULT_LEVEL0_CAPACITY: usize = 4;

/// One sparse-index entry is emitted per this many records.
pub const DEFAULT_SPARSE_INDEX_STRIDE: usize = 4;

/// Target size multiplier between levels.
pub const DEFAULT_FANOUT: usize = 10;

/// Tail bytes scanned for trailer discovery when opening a table.
pub const DEFAULT_TRAILER_WINDOW: usize = 150;

/// Max live records per memtable before a flush is forced.
pub const DEFAULT_MEMTABLE_MAX_SIZE: usize = 1024;

/// Configuration for a [`Db`](crate::Db) instance.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Maximum live records per memtable. `0` means unbounded — the
    /// memtable then never reports [`CapacityExceeded`] and flushes only
    /// happen via [`Db::flush`](crate::Db::flush).
    ///
    /// [`CapacityExceeded`]: crate::memtable::MemtableError::CapacityExceeded
    pub memtable_max_size: usize,

    /// Maximum number of Level-0 runs (K). Inserting a memtable past this
    /// bound first merges all of Level-0 into Level-1.
    pub level0_capacity: usize,

    /// Sparse-index stride (S): one index entry per S records, starting
    /// at record 0.
    pub sparse_index_stride: usize,

    /// Target size multiplier between levels. Reserved for multi-level
    /// compaction; Level-0 → Level-1 merges ignore it.
    pub fanout: usize,

    /// Entries absorbed by the hot write cache before it is drained into
    /// the memtable. `0` drains on every write (write-through).
    pub hot_cache_capacity: usize,

    /// Directory holding the live sorted runs (`layer_{level}_{ordinal}`).
    pub data_dir: PathBuf,

    /// Staging directory for compaction output. Must be on the same
    /// filesystem as `data_dir` so the staged run can be renamed into
    /// place.
    pub compaction_dir: PathBuf,

    /// Tail window (T) scanned for the `$$` trailer sentinel when opening
    /// a table. The trailer must serialize to fewer than this many bytes.
    pub trailer_window: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            memtable_max_size: DEFAULT_MEMTABLE_MAX_SIZE,
            level0_capacity: DEFAULT_LEVEL0_CAPACITY,
            sparse_index_stride: DEFAULT_SPARSE_INDEX_STRIDE,
            fanout: DEFAULT_FANOUT,
            hot_cache_capacity: 0,
            data_dir: PathBuf::from("./data"),
            compaction_dir: PathBuf::from("./compaction"),
            trailer_window: DEFAULT_TRAILER_WINDOW,
        }
    }
}
