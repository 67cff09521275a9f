//! Raw-transport capture pipeline.
//!
//! # Data Flow
//! ```text
//! accepted TcpStream
//!     → frame.rs (read one request frame, idle-timeout heuristic)
//!     → parser.rs (structured fields, or ParseError for binary junk)
//!     → sequence.rs (allocate the global request number)
//!     → record.rs (CapturedRequest / FallbackRecord)
//!     → storage writer persists both artifacts
//! ```
//!
//! # Design Decisions
//! - Each connection owns its frame exclusively; only the sequence counter
//!   is shared, behind its file lock
//! - Parse failure degrades to a fallback record; the raw bytes are always
//!   kept and the fixed response is always sent

pub mod frame;
pub mod parser;
pub mod record;
pub mod sequence;

pub use frame::{read_frame, FramePolicy};
pub use parser::{parse, ParseError, ParsedRequest};
pub use record::{CaptureContext, CaptureOutcome, CapturedRequest, FallbackRecord};
pub use sequence::{FileSequence, MemorySequence, SequenceAllocator};
