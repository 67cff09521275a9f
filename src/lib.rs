//! Honeypot-style HTTP request recorder.
//!
//! Accepts arbitrary inbound connections, frames one HTTP/1.x request per
//! connection from the raw byte stream, persists the structured record and
//! the verbatim wire bytes under a date-partitioned tree keyed by
//! `{sequence}:{uuid}`, and answers everything with the same fixed body.

// Core pipeline
pub mod capture;
pub mod net;
pub mod server;
pub mod storage;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod response;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use server::CaptureServer;
