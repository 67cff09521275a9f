//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Bootstrap storage → Bind listener → Run
//!
//! Shutdown (shutdown.rs):
//!     SIGINT → stop accepting → listening socket closes →
//!     in-flight capture units finish naturally
//! ```

pub mod shutdown;

pub use shutdown::{watch_interrupt, Shutdown};
