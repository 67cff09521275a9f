//! Cross-process sequence allocation.
//!
//! # Responsibilities
//! - Issue strictly increasing request sequence numbers
//! - Persist the counter so numbering survives restarts
//! - Stay correct under concurrent threads and separate processes
//!
//! # Design Decisions
//! - One small counter file, guarded by an exclusive advisory lock
//! - Lock scope covers read, increment, and write as one unit
//! - `allocate` returns the post-increment value
//! - Allocator I/O failure degrades to the sentinel value 0 instead of
//!   stalling capture

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Issued when the counter cannot be read or written.
pub const SENTINEL_SEQUENCE: u64 = 0;

/// Source of request sequence numbers.
///
/// Injected into the capture pipeline so tests can substitute an in-memory
/// implementation for the file-backed one.
pub trait SequenceAllocator: Send + Sync {
    /// Allocate the next sequence number.
    ///
    /// Never fails: if the backing store is unavailable the allocator logs
    /// and returns [`SENTINEL_SEQUENCE`].
    fn allocate(&self) -> u64;
}

/// File-backed allocator shared across threads and processes.
///
/// The counter file holds a single ASCII integer, the last issued value.
/// Every allocation takes an exclusive blocking lock on the file, reads the
/// current value (empty or unparseable content counts as 0), writes back
/// `current + 1`, and returns the new value.
pub struct FileSequence {
    path: PathBuf,
}

impl FileSequence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the counter with a chosen baseline.
    ///
    /// One-time startup operation used to avoid directory collisions with a
    /// previous run's on-disk tree; not part of the per-request path.
    pub fn reset(&self, baseline: u64) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, baseline.to_string())
    }

    fn next(&self) -> std::io::Result<u64> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        file.lock()?;
        let result = Self::bump(&mut file);
        // The lock also drops with the file handle; unlock failures are not
        // worth surfacing past the allocation result.
        let _ = file.unlock();
        result
    }

    fn bump(file: &mut File) -> std::io::Result<u64> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let current: u64 = contents.trim().parse().unwrap_or(0);
        let next = current + 1;

        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(next.to_string().as_bytes())?;
        Ok(next)
    }
}

impl SequenceAllocator for FileSequence {
    fn allocate(&self) -> u64 {
        match self.next() {
            Ok(sequence) => sequence,
            Err(e) => {
                tracing::error!(
                    counter_file = %self.path.display(),
                    error = %e,
                    "Sequence counter unavailable, issuing sentinel"
                );
                SENTINEL_SEQUENCE
            }
        }
    }
}

/// In-memory allocator for tests and embedded use.
pub struct MemorySequence {
    last: AtomicU64,
}

impl MemorySequence {
    pub fn new(baseline: u64) -> Self {
        Self {
            last: AtomicU64::new(baseline),
        }
    }
}

impl Default for MemorySequence {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SequenceAllocator for MemorySequence {
    fn allocate(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_counter_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let seq = FileSequence::new(dir.path().join("last-query.txt"));
        assert_eq!(seq.allocate(), 1);
        assert_eq!(seq.allocate(), 2);
    }

    #[test]
    fn garbage_content_counts_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last-query.txt");
        std::fs::write(&path, "not a number").unwrap();
        let seq = FileSequence::new(&path);
        assert_eq!(seq.allocate(), 1);
    }

    #[test]
    fn reset_sets_the_next_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let seq = FileSequence::new(dir.path().join("last-query.txt"));
        seq.reset(11).unwrap();
        assert_eq!(seq.allocate(), 12);
    }

    #[test]
    fn memory_sequence_counts_from_baseline() {
        let seq = MemorySequence::new(5);
        assert_eq!(seq.allocate(), 6);
        assert_eq!(seq.allocate(), 7);
    }
}
