//! Line boundary reassembly for chunked text
//!
//! This crate holds the part of `linewise` that has no I/O in it: recognizing
//! LF, CRLF and CR terminators, and stitching lines back together when the
//! text arrives in chunks cut at arbitrary positions. It has no external
//! dependencies.

#![warn(missing_docs)]

pub mod assembler;
pub mod terminator;

pub use assembler::{split_lines, LineAssembler};
pub use terminator::{find_terminator, Terminator, TerminatorCounts};
