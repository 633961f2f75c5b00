//! Reader error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a line reader
///
/// None of these are returned from the reader's control methods; they reach
/// the caller as `error` events.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The source file could not be opened
    #[error("failed to open {}: {source}", path.display())]
    Open {
        /// Normalized path that was opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading from an open file failed
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Normalized path being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// I/O error from a source that has no path
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encoding label is unknown or not a text encoding
    #[error("unsupported encoding '{label}'")]
    UnsupportedEncoding {
        /// The label as given by the caller
        label: String,
    },

    /// Invalid reader options
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ReaderError {
    /// The underlying I/O error, if this error came from I/O
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            ReaderError::Open { source, .. } | ReaderError::Read { source, .. } => Some(source),
            ReaderError::Io(err) => Some(err),
            ReaderError::UnsupportedEncoding { .. } | ReaderError::Config(_) => None,
        }
    }
}

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;
