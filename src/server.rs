//! Accept loop and per-connection capture pipeline.
//!
//! # Responsibilities
//! - Accept connections until shutdown fires
//! - Spawn one independent capture unit per connection
//! - Run frame → parse → allocate → persist → respond inside each unit
//!
//! # Design Decisions
//! - The acceptor never blocks on a unit's work; a slow client cannot
//!   stall acceptance of others
//! - Sequence allocation happens on the blocking pool so the counter file
//!   lock never parks a runtime worker
//! - Persistence failure is logged and the fixed response still goes out;
//!   the remote client must keep seeing a normal service

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::capture::record::{CaptureContext, CaptureOutcome, CapturedRequest, FallbackRecord};
use crate::capture::sequence::{SequenceAllocator, SENTINEL_SEQUENCE};
use crate::capture::{frame, parser, FramePolicy};
use crate::config::ServerConfig;
use crate::net::{ConnectionPermit, Listener};
use crate::response;
use crate::storage::StorageWriter;

/// Everything one capture unit needs, shared across connections.
struct Pipeline {
    policy: FramePolicy,
    allocator: Arc<dyn SequenceAllocator>,
    writer: StorageWriter,
    robots_path: std::path::PathBuf,
}

/// The capture server: listener-facing wrapper around the pipeline.
pub struct CaptureServer {
    pipeline: Arc<Pipeline>,
}

impl CaptureServer {
    /// Create a server with an injected sequence allocator.
    pub fn new(config: &ServerConfig, allocator: Arc<dyn SequenceAllocator>) -> Self {
        let pipeline = Pipeline {
            policy: FramePolicy {
                idle_timeout: Duration::from_millis(config.capture.idle_frame_timeout_ms),
                max_frame_bytes: config.capture.max_frame_bytes,
            },
            allocator,
            writer: StorageWriter::new(&config.capture.db_root),
            robots_path: config.response.robots_path.clone(),
        };
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Run the accept loop until the shutdown signal fires.
    ///
    /// In-flight capture units are left to finish on their own; only the
    /// listening socket closes when this returns.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        self.pipeline.writer.bootstrap().await?;

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Capture server started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Accept loop stopping");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer, permit)) => {
                            let pipeline = Arc::clone(&self.pipeline);
                            tokio::spawn(async move {
                                handle_connection(pipeline, stream, peer, permit).await;
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                        }
                    }
                }
            }
        }

        tracing::info!("Capture server stopped");
        Ok(())
    }
}

/// One capture unit: owns its connection exclusively from accept to close.
async fn handle_connection(
    pipeline: Arc<Pipeline>,
    mut stream: TcpStream,
    peer: std::net::SocketAddr,
    permit: ConnectionPermit,
) {
    let raw = match frame::read_frame(&mut stream, &pipeline.policy).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(peer_addr = %peer, error = %e, "Frame read failed");
            return;
        }
    };
    if raw.is_empty() {
        tracing::debug!(peer_addr = %peer, "Peer sent nothing, closing");
        return;
    }

    let parsed = parser::parse(&raw);

    // robots.txt companion: served verbatim, bypassing capture.
    if let Ok(request) = &parsed {
        if request.path == "/robots.txt" {
            if let Some(body) = response::robots_response(&pipeline.robots_path).await {
                tracing::info!(peer_addr = %peer, "Served robots.txt");
                finish(stream, &body).await;
                return;
            }
        }
    }

    let allocator = Arc::clone(&pipeline.allocator);
    let sequence = match tokio::task::spawn_blocking(move || allocator.allocate()).await {
        Ok(sequence) => sequence,
        Err(e) => {
            tracing::error!(error = %e, "Sequence allocation task failed");
            SENTINEL_SEQUENCE
        }
    };
    let ctx = CaptureContext::new(sequence, peer);

    let outcome = match parsed {
        Ok(request) => {
            tracing::info!(
                sequence = ctx.sequence,
                peer_addr = %peer,
                method = %request.method,
                path = %request.path,
                user_agent = request.header("user-agent").unwrap_or(""),
                "Request captured"
            );
            CaptureOutcome::Parsed(CapturedRequest::from_parsed(&ctx, request))
        }
        Err(e) => {
            tracing::warn!(
                sequence = ctx.sequence,
                peer_addr = %peer,
                raw_len = raw.len(),
                error = %e,
                "Unparsable request, recording fallback metadata"
            );
            CaptureOutcome::Fallback(FallbackRecord::new(&ctx, raw.len(), e.to_string()))
        }
    };

    match pipeline.writer.persist(&ctx, &raw, &outcome).await {
        Ok(dir) => tracing::info!(
            sequence = ctx.sequence,
            storage_dir = %dir.display(),
            "Request logged"
        ),
        // Degraded outcome: the client still gets the fixed response.
        Err(e) => tracing::error!(
            sequence = ctx.sequence,
            error = %e,
            "Failed to persist capture"
        ),
    }

    finish(stream, &response::fixed_response()).await;
    drop(permit);
}

/// Send a response and close the connection; the peer may already be gone.
async fn finish(mut stream: TcpStream, body: &[u8]) {
    if let Err(e) = stream.write_all(body).await {
        tracing::debug!(error = %e, "Response write failed");
    }
    let _ = stream.shutdown().await;
}
