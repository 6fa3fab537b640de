//! # Sorted String Table (SSTable) Module
//!
//! An **immutable**, **disk-backed** sorted run of records with an
//! embedded sparse index and a self-locating trailer. SSTables are
//! produced by flushing a frozen memtable or by merging existing runs
//! during compaction, and are never modified afterwards.
//!
//! ## On-disk layout
//!
//! ```text
//! [0 .. data_len)                    record stream — JSON objects, ascending key order
//! [data_len .. data_len + index_len) serialized sparse index (key → {start, len})
//! [.. 2 bytes ..]                    separator sentinel "$$"
//! [tail, < T bytes]                  serialized file-index trailer
//! ```
//!
//! Every record is a self-delimiting, brace-balanced JSON object, so a
//! reader can recover object boundaries from raw bytes by tracking brace
//! depth — no length prefixes needed. Braces inside string literals are
//! skipped by tracking string/escape state while counting.
//!
//! The trailer is discovered by reading the final `T` bytes of the file
//! (`T` = `trailer_window`, default 150) and parsing the JSON that
//! follows the `$$` sentinel. Opening a table loads only the trailer and
//! the sparse index; record bytes are read on demand.
//!
//! ## Guarantees
//!
//! - The record stream is sorted by key; keys are unique after a merge
//!   build (flush builds inherit uniqueness from the memtable).
//! - Every sparse-index entry addresses exactly one decodable record
//!   whose key equals the entry key. One entry is emitted every `S`
//!   records, starting at record 0.
//! - The trailer's `min_max` equals the first/last record keys and is
//!   consulted to reject out-of-range point lookups without touching
//!   the record stream.
//! - Files are written to a temporary path and renamed into place; a
//!   crash cannot leave a half-written table under the final name.

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod builder;

#[cfg(test)]
mod tests;

pub use builder::SstWriter;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::ops::Bound;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Separator between the sparse index and the file-index trailer.
pub(crate) const TRAILER_SENTINEL: &[u8; 2] = b"$$";

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by SSTable operations (open, get, scan, build, write).
///
/// A missing key is **not** an error — lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum TableError {
    /// Underlying file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed trailer, sparse index, or record.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// No `$$` sentinel (followed by a parseable trailer) was found in
    /// the tail window. The payload is the window size scanned.
    #[error("no trailer sentinel in the final {0} bytes")]
    TrailerMissing(usize),

    /// The trailer would not fit in the discovery window.
    #[error("file-index trailer is {size} bytes, must be under {window}")]
    TrailerTooLarge { size: usize, window: usize },

    /// A build was attempted with no records.
    #[error("cannot build an empty table")]
    Empty,

    /// Structural corruption: an index entry or window points outside
    /// the record stream.
    #[error("malformed table: {0}")]
    Malformed(String),
}

// ------------------------------------------------------------------------------------------------
// On-disk format structures
// ------------------------------------------------------------------------------------------------

/// The atomic stored unit: one key/value version.
///
/// `written_at` (nanoseconds since the UNIX epoch) orders concurrent
/// versions of the same key during compaction; `tombstone` marks a
/// deletion that must suppress older versions at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record key. Non-empty; compared lexicographically.
    pub key: String,

    /// Stored value. May be empty, and is empty for tombstones.
    pub value: String,

    /// Version timestamp in nanoseconds since the UNIX epoch.
    pub written_at: u64,

    /// Whether this record denotes a deletion.
    pub tombstone: bool,
}

/// Location of one serialized record inside the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseEntry {
    /// Byte offset from the beginning of the record stream.
    pub start: usize,

    /// Serialized length of the record in bytes.
    pub len: usize,
}

/// Minimum and maximum record keys present in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    /// Key of the first record.
    pub start_key: String,

    /// Key of the last record.
    pub end_key: String,
}

/// Fixed trailer locating the record stream and sparse index.
///
/// Serialized as the final JSON object of the file, after the `$$`
/// sentinel; must stay under the configured trailer window so readers
/// can discover it from the file tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndex {
    /// Offset of the record stream (always 0).
    pub data_start: usize,

    /// Byte length of the record stream.
    pub data_len: usize,

    /// Offset of the serialized sparse index (equals `data_len`).
    pub index_start: usize,

    /// Byte length of the serialized sparse index.
    pub index_len: usize,

    /// First and last record keys.
    pub min_max: KeyRange,
}

// ------------------------------------------------------------------------------------------------
// Table
// ------------------------------------------------------------------------------------------------

/// A single sorted run.
///
/// Freshly built tables keep their record stream in memory until
/// [`Table::write`] persists them; tables opened from disk hold only the
/// sparse index and trailer, and serve reads with windowed `read_at`
/// calls against the backing file.
#[derive(Debug)]
pub struct Table {
    /// In-memory record stream. Empty for tables opened from disk.
    pub(crate) data: Vec<u8>,

    /// Sampled key → record location, one entry per stride.
    pub(crate) sparse_index: BTreeMap<String, SparseEntry>,

    /// Trailer metadata.
    pub(crate) file_index: FileIndex,

    /// Backing file path.
    pub(crate) path: PathBuf,
}

impl Table {
    /// Opens a table from disk, loading only the trailer and sparse
    /// index.
    ///
    /// The final `trailer_window` bytes are scanned for the `$$`
    /// sentinel; the JSON that follows it is the [`FileIndex`], which in
    /// turn locates the sparse index. The record stream is left on disk.
    pub fn open(path: impl AsRef<Path>, trailer_window: usize) -> Result<Self, TableError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_len = file.metadata()?.len() as usize;

        let window_len = trailer_window.min(file_len);
        let mut tail = vec![0u8; window_len];
        file.read_exact_at(&mut tail, (file_len - window_len) as u64)?;

        let file_index = locate_trailer(&tail).ok_or(TableError::TrailerMissing(window_len))?;

        if file_index.index_start + file_index.index_len > file_len {
            return Err(TableError::Malformed(format!(
                "sparse index {}..{} exceeds file length {}",
                file_index.index_start,
                file_index.index_start + file_index.index_len,
                file_len,
            )));
        }

        let mut index_bytes = vec![0u8; file_index.index_len];
        file.read_exact_at(&mut index_bytes, file_index.index_start as u64)?;
        let sparse_index: BTreeMap<String, SparseEntry> = serde_json::from_slice(&index_bytes)?;

        trace!(
            path = %path.display(),
            entries = sparse_index.len(),
            data_len = file_index.data_len,
            "opened table"
        );

        Ok(Self {
            data: Vec::new(),
            sparse_index,
            file_index,
            path,
        })
    }

    /// Trailer metadata.
    pub fn file_index(&self) -> &FileIndex {
        &self.file_index
    }

    /// Sampled key locations.
    pub fn sparse_index(&self) -> &BTreeMap<String, SparseEntry> {
        &self.sparse_index
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` when `key` falls inside this table's `[min_key, max_key]`.
    pub fn covers(&self, key: &str) -> bool {
        let range = &self.file_index.min_max;
        range.start_key.as_str() <= key && key <= range.end_key.as_str()
    }

    /// Point lookup.
    ///
    /// Out-of-range keys are rejected from `min_max` alone. A sparse-hit
    /// key is served with a single exact-sized read. Otherwise the byte
    /// window between the neighboring index entries is read and walked
    /// object by object until the key is found or passed.
    pub fn get(&self, key: &str) -> Result<Option<Record>, TableError> {
        if !self.covers(key) {
            return Ok(None);
        }

        if let Some(entry) = self.sparse_index.get(key) {
            let bytes = self.read_window(entry.start, entry.len)?;
            let record: Record = serde_json::from_slice(&bytes)?;
            return Ok(Some(record));
        }

        // lo: end of the closest indexed record below the key.
        // hi: start of the closest indexed record above it, or the last
        // data byte when the key sorts past every indexed key.
        let mut lo = 0usize;
        let mut hi = self.file_index.data_len - 1;
        let below = (Bound::Unbounded, Bound::Excluded(key));
        if let Some((_, entry)) = self.sparse_index.range::<str, _>(below).next_back() {
            lo = entry.start + entry.len;
        }
        let above = (Bound::Excluded(key), Bound::Unbounded);
        if let Some((_, entry)) = self.sparse_index.range::<str, _>(above).next() {
            hi = entry.start;
        }

        let bytes = self.read_window(lo, hi - lo + 1)?;
        for object in ObjectScanner::new(&bytes) {
            let record: Record = serde_json::from_slice(object)?;
            match record.key.as_str().cmp(key) {
                Ordering::Equal => return Ok(Some(record)),
                Ordering::Greater => break,
                Ordering::Less => {}
            }
        }
        Ok(None)
    }

    /// Full scan: decodes the entire record stream in key order.
    ///
    /// Compaction uses this to load merge inputs; tombstones are
    /// returned as-is.
    pub fn get_all(&self) -> Result<Vec<Record>, TableError> {
        let bytes = self.read_window(0, self.file_index.data_len)?;
        let mut records = Vec::new();
        for object in ObjectScanner::new(&bytes) {
            records.push(serde_json::from_slice(object)?);
        }
        Ok(records)
    }

    /// Persists the table: record stream, sparse index, sentinel,
    /// trailer.
    ///
    /// Written to `<path>.tmp` and renamed into place so the final name
    /// never holds a partial file.
    pub fn write(&self) -> Result<(), TableError> {
        use std::io::Write;

        let index_bytes = serde_json::to_vec(&self.sparse_index)?;
        let trailer = serde_json::to_vec(&self.file_index)?;

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(&self.data)?;
        file.write_all(&index_bytes)?;
        file.write_all(TRAILER_SENTINEL)?;
        file.write_all(&trailer)?;
        file.sync_all()?;
        std::fs::rename(&tmp, &self.path)?;

        trace!(path = %self.path.display(), bytes = self.file_index.data_len, "table written");
        Ok(())
    }

    /// Moves the backing file reference after a rename on disk.
    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Reads `len` bytes of the record stream starting at `start`
    /// (stream-relative). Served from memory for freshly built tables,
    /// otherwise with a positioned read against the backing file.
    fn read_window(&self, start: usize, len: usize) -> Result<Cow<'_, [u8]>, TableError> {
        if start + len > self.file_index.data_len {
            return Err(TableError::Malformed(format!(
                "window {}..{} exceeds record stream of {} bytes",
                start,
                start + len,
                self.file_index.data_len,
            )));
        }

        if !self.data.is_empty() {
            return Ok(Cow::Borrowed(&self.data[start..start + len]));
        }

        let file = File::open(&self.path)?;
        let mut buf = vec![0u8; len];
        file.read_exact_at(&mut buf, (self.file_index.data_start + start) as u64)?;
        Ok(Cow::Owned(buf))
    }
}

/// Finds the sentinel whose following bytes parse as a [`FileIndex`].
///
/// The tail window may begin mid-stream, and record values or index keys
/// can legitimately contain `$$`, so every occurrence is tried in order;
/// only the true sentinel is followed by a single clean JSON trailer
/// running to the end of the file.
fn locate_trailer(tail: &[u8]) -> Option<FileIndex> {
    let mut from = 0;
    while let Some(pos) = tail[from..]
        .windows(TRAILER_SENTINEL.len())
        .position(|w| w == TRAILER_SENTINEL)
    {
        let candidate = &tail[from + pos + TRAILER_SENTINEL.len()..];
        if let Ok(file_index) = serde_json::from_slice::<FileIndex>(candidate) {
            return Some(file_index);
        }
        from += pos + 1;
    }
    None
}

// ------------------------------------------------------------------------------------------------
// Brace-balanced object scanner
// ------------------------------------------------------------------------------------------------

/// Iterates the complete serialized objects in a byte window.
///
/// Tracks brace depth to recover object boundaries without decoding.
/// Braces inside JSON string literals do not count: the scanner follows
/// string and backslash-escape state byte by byte. A trailing partial
/// object (a window may end mid-record) is silently ignored.
///
/// The window must start on an object boundary; sparse-index offsets
/// guarantee this for every window the table reads.
pub(crate) struct ObjectScanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ObjectScanner<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl<'a> Iterator for ObjectScanner<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.buf.len() && self.buf[self.pos] != b'{' {
            self.pos += 1;
        }
        let start = self.pos;

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut i = start;
        while i < self.buf.len() {
            let byte = self.buf[i];
            if in_string {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                }
            } else {
                match byte {
                    b'"' => in_string = true,
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            self.pos = i + 1;
                            return Some(&self.buf[start..=i]);
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }

        // Incomplete tail object.
        self.pos = self.buf.len();
        None
    }
}
