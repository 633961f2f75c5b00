//! Event-driven, pausable line reader
//!
//! This crate reads a text file (or any [`ByteSource`]) chunk by chunk and
//! reports it as a sequence of events: `open`, then one `line` per line in
//! file order, then exactly one `end`. Failures arrive as `error` events.
//! Delivery can be paused, resumed or cut short with [`ReaderHandle`].

#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod encoding;
pub mod error;
pub mod events;
pub mod reader;
pub mod source;

// Re-export key types
pub use config::{ReaderOptions, ReaderOptionsBuilder, DEFAULT_CHUNK_SIZE};
pub use control::{ReaderHandle, ReaderState};
pub use encoding::{resolve_encoding, TextEncoding, DEFAULT_ENCODING};
pub use error::{ReaderError, Result};
pub use events::{ReaderEvent, Subscription};
pub use reader::{LineReader, ReaderStats};
pub use source::{normalize_path, ByteSource, FileSource, StreamSource};

// Re-export from core for convenience
pub use linewise_core::{Terminator, TerminatorCounts};
