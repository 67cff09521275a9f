//! Date-partitioned artifact writer.
//!
//! # Responsibilities
//! - Compute `<root>/<YYYY>/<MM>/<DD>/<sequence>:<uuid>/` from a capture
//!   context
//! - Write the verbatim wire bytes and the structured (or fallback) record
//! - Stay idempotent on directory creation; leaves never collide because
//!   each caller holds an exclusively allocated sequence number

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::capture::record::{CaptureContext, CaptureOutcome};

/// Verbatim wire bytes, headers included.
pub const RAW_ARTIFACT: &str = "raw_request.txt";
/// Structured record, or the fallback metadata on parse failure.
pub const RECORD_ARTIFACT: &str = "request.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("create capture directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("write {path}: {source}")]
    WriteArtifact {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("encode structured record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes capture artifacts under a flat directory tree.
#[derive(Debug, Clone)]
pub struct StorageWriter {
    root: PathBuf,
}

impl StorageWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the db root. Run once at startup; failure here is fatal
    /// because nothing can be persisted without it.
    pub async fn bootstrap(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Persist one captured request, returning the leaf directory.
    ///
    /// Both artifacts are written before the caller may answer the client;
    /// a failure is reported rather than crashing the connection handler.
    pub async fn persist(
        &self,
        ctx: &CaptureContext,
        raw: &[u8],
        outcome: &CaptureOutcome,
    ) -> Result<PathBuf, StorageError> {
        let record = match outcome {
            CaptureOutcome::Parsed(record) => serde_json::to_vec_pretty(record)?,
            CaptureOutcome::Fallback(record) => serde_json::to_vec_pretty(record)?,
        };

        let dir = self
            .root
            .join(ctx.captured_at.format("%Y").to_string())
            .join(ctx.captured_at.format("%m").to_string())
            .join(ctx.captured_at.format("%d").to_string())
            .join(ctx.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let raw_path = dir.join(RAW_ARTIFACT);
        tokio::fs::write(&raw_path, raw)
            .await
            .map_err(|source| StorageError::WriteArtifact {
                path: raw_path,
                source,
            })?;

        let record_path = dir.join(RECORD_ARTIFACT);
        tokio::fs::write(&record_path, record)
            .await
            .map_err(|source| StorageError::WriteArtifact {
                path: record_path,
                source,
            })?;

        Ok(dir)
    }
}
