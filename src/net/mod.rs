//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → Hand off to the capture pipeline
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each capture unit owns its connection exclusively

pub mod listener;

pub use listener::{ConnectionPermit, Listener, ListenerError};
