//! Line reassembly across chunk boundaries
//!
//! Text arrives in chunks whose edges fall anywhere: in the middle of a line,
//! right after a terminator, or between the `\r` and `\n` of a CRLF pair.
//! [`LineAssembler`] turns that chunk sequence back into whole lines:
//!
//! - complete lines go to a FIFO pending queue in file order;
//! - the unterminated tail of the latest chunk is kept as the *fragment* and
//!   prefixed to the first line completed by a later chunk;
//! - a `\r` ending a chunk completes its line at once, and a `\n` opening the
//!   next chunk is folded into the same CRLF terminator.
//!
//! The fragment never contains a terminator.

use std::collections::VecDeque;

use crate::terminator::{find_terminator, Terminator, TerminatorCounts};

/// Reassembles lines from a sequence of text chunks
#[derive(Debug, Default)]
pub struct LineAssembler {
    /// Complete lines not yet handed out
    pending: VecDeque<String>,
    /// Unterminated tail of the most recent chunk
    fragment: String,
    /// The previous chunk ended with `\r`
    carriage_return: bool,
    /// Terminators seen so far
    counts: TerminatorCounts,
}

impl LineAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `chunk` into lines and queue every completed one.
    ///
    /// Returns the number of lines the chunk completed.
    pub fn ingest(&mut self, chunk: &str) -> usize {
        let mut text = chunk;

        if self.carriage_return && !text.is_empty() {
            self.carriage_return = false;
            if let Some(rest) = text.strip_prefix('\n') {
                self.counts.promote_cr();
                text = rest;
            }
        }

        let bytes = text.as_bytes();
        let mut start = 0;
        let mut completed = 0;

        while let Some((pos, terminator)) = find_terminator(bytes, start) {
            self.complete_line(&text[start..pos]);
            self.counts.record(terminator);
            completed += 1;

            start = pos + terminator.len();
            if terminator == Terminator::Cr && start == bytes.len() {
                self.carriage_return = true;
            }
        }

        self.fragment.push_str(&text[start..]);
        completed
    }

    fn complete_line(&mut self, segment: &str) {
        let mut line = std::mem::take(&mut self.fragment);
        line.push_str(segment);
        self.pending.push_back(line);
    }

    /// Take the oldest complete line
    pub fn pop_line(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Take the fragment as the final line of the input.
    ///
    /// Returns `None` when the fragment is empty, i.e. the input ended exactly
    /// on a terminator. Only meaningful once no more chunks will arrive.
    pub fn take_fragment(&mut self) -> Option<String> {
        self.carriage_return = false;
        if self.fragment.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.fragment))
        }
    }

    /// Current unterminated tail
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Number of complete lines waiting
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True when at least one complete line is waiting
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// True when neither complete lines nor a fragment remain
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.fragment.is_empty()
    }

    /// Terminators seen so far
    pub fn terminator_counts(&self) -> TerminatorCounts {
        self.counts
    }
}

/// Split a complete text into lines, terminators removed.
///
/// A trailing unterminated line is included; a final terminator does not
/// produce an extra empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut assembler = LineAssembler::new();
    assembler.ingest(text);

    let mut lines: Vec<String> = assembler.pending.drain(..).collect();
    lines.extend(assembler.take_fragment());
    lines
}
