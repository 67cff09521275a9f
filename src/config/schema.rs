//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the capture
//! server. All types derive Serde traits for deserialization from config
//! files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the capture server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Capture pipeline settings (db root, framing policy, counter).
    pub capture: CaptureConfig,

    /// Response settings.
    pub response: ResponseConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 1024,
        }
    }
}

/// Capture pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Root of the storage tree.
    pub db_root: PathBuf,

    /// Idle-frame timeout: how long a silent peer may pause before the
    /// frame is considered complete.
    pub idle_frame_timeout_ms: u64,

    /// Upper bound on one captured frame.
    pub max_frame_bytes: usize,

    /// Optional startup baseline for the sequence counter, used to skip
    /// past directories left by a previous run.
    pub sequence_baseline: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            db_root: PathBuf::from("db"),
            idle_frame_timeout_ms: 500,
            max_frame_bytes: 1024 * 1024,
            sequence_baseline: None,
        }
    }
}

impl CaptureConfig {
    /// Location of the persisted sequence counter.
    pub fn counter_path(&self) -> PathBuf {
        self.db_root.join("last-query.txt")
    }
}

/// Response configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// File served verbatim for `/robots.txt`, bypassing capture, when it
    /// exists.
    pub robots_path: PathBuf,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            robots_path: PathBuf::from("robots.txt"),
        }
    }
}
