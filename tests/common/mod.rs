//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tarpit::capture::FileSequence;
use tarpit::config::ServerConfig;
use tarpit::net::Listener;
use tarpit::{CaptureServer, Shutdown};

/// Start a capture server on an ephemeral port.
///
/// The caller provides the config (typically with `db_root` pointing into a
/// temp dir); the bind address is always overridden to an ephemeral port.
pub async fn start_server(mut config: ServerConfig) -> (SocketAddr, Shutdown) {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let allocator = Arc::new(FileSequence::new(config.capture.counter_path()));
    let server = CaptureServer::new(&config, allocator);

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (addr, shutdown)
}

/// Send raw bytes over a fresh connection and collect the full response.
pub async fn send_raw(addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(payload).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

/// Collect the `<seq>:<uuid>` capture leaves under a db root.
pub fn capture_dirs(db_root: &Path) -> Vec<PathBuf> {
    fn subdirs(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect()
            })
            .unwrap_or_default()
    }

    let mut leaves = Vec::new();
    for year in subdirs(db_root) {
        for month in subdirs(&year) {
            for day in subdirs(&month) {
                leaves.extend(subdirs(&day));
            }
        }
    }
    leaves
}

/// Read and decode a capture leaf's structured record.
pub fn read_record(leaf: &Path) -> serde_json::Value {
    let bytes = std::fs::read(leaf.join("request.json")).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
