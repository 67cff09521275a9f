//! On-disk persistence for captured requests.
//!
//! One directory per request under `db/<YYYY>/<MM>/<DD>/<seq>:<uuid>/`,
//! holding the verbatim byte stream next to the structured record. The tree
//! is write-once per leaf; no locking is needed beyond the sequence counter.

pub mod writer;

pub use writer::{StorageError, StorageWriter, RAW_ARTIFACT, RECORD_ARTIFACT};
