//! # stratadb
//!
//! An embeddable, persistent **ordered key-value store** built on a
//! **Log-Structured Merge Tree (LSM-tree)** architecture. Designed for
//! write-heavy workloads and point lookups over string keys, where data
//! volumes exceed memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        Db                            │
//! │  ┌──────────┐   ┌─────────────┐   ┌──────────────┐   │
//! │  │   Hot    │   │   Active    │   │ Sorted runs  │   │
//! │  │  cache   │──►│  memtable   │──►│  (on disk)   │   │
//! │  │          │   │  (RB tree)  │   │              │   │
//! │  └──────────┘   └─────────────┘   └──────┬───────┘   │
//! │      swap            swap                │           │
//! │                                          ▼           │
//! │  ┌──────────────────────────────────────────────┐    │
//! │  │  LSM manager: Level-0 (≤ K runs, overlap ok) │    │
//! │  │  → Level-1 (merged, disjoint key ranges)     │    │
//! │  └──────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | The [`Db`] façade — put, get, delete, flush |
//! | [`memtable`] | Ordered in-memory index: arena-backed red–black tree with a swap mutex |
//! | [`sstable`] | Immutable sorted runs: JSON record stream, sparse index, self-locating trailer |
//! | [`lsm`] | Level manager: reconstruction, flush to Level-0, leveled compaction |
//! | [`cache`] | Write-absorbing hot cache in front of the memtable |
//! | [`config`] | All tunables in one [`DbConfig`] |
//! | [`util`] | Generic adjacent-duplicate compaction used by the merge build |
//!
//! ## Key behaviors
//!
//! - **Last writer wins** — rewriting a key overwrites in place in
//!   memory; on disk, compaction keeps the version with the newest
//!   timestamp per key.
//! - **Tombstones** — deletes are markers that suppress older versions
//!   at read time and travel through compaction (a deletion at any
//!   version sticks).
//! - **Self-locating tables** — each run's trailer is discovered by
//!   scanning the file tail for a `$$` sentinel; opening a table loads
//!   only its trailer and sparse index.
//! - **Synchronous compaction** — when Level-0 reaches capacity, its
//!   runs are merged into a single Level-1 run before the flush that
//!   triggered the merge proceeds.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stratadb::{Db, DbConfig};
//!
//! let config = DbConfig {
//!     data_dir: "/tmp/stratadb/data".into(),
//!     compaction_dir: "/tmp/stratadb/compaction".into(),
//!     ..DbConfig::default()
//! };
//!
//! let mut db = Db::open(config).unwrap();
//!
//! db.put("hello", "world").unwrap();
//! assert_eq!(db.get("hello").unwrap(), Some("world".to_owned()));
//!
//! db.delete("hello").unwrap();
//! assert_eq!(db.get("hello").unwrap(), None);
//!
//! db.close().unwrap();
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod lsm;
pub mod memtable;
pub mod sstable;
pub mod util;

pub use config::DbConfig;
pub use engine::{Db, DbError, DbStats};
