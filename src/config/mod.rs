//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → ServerConfig (immutable)
//!     → shared with the server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs (or none at all)

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::{CaptureConfig, ListenerConfig, ResponseConfig, ServerConfig};
