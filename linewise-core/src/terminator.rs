//! Line terminator recognition
//!
//! Three conventions are recognized: LF (`\n`), CRLF (`\r\n`) and a lone CR
//! (`\r`). All three are ASCII, so scanning the UTF-8 bytes of a `&str` never
//! lands inside a multi-byte character.

/// A recognized line terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminator {
    /// Line Feed (Unix) - `\n`
    Lf,
    /// Carriage Return + Line Feed (Windows) - `\r\n`
    CrLf,
    /// Carriage Return (classic Mac OS) - `\r`
    Cr,
}

impl Terminator {
    /// The terminator's text
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminator::Lf => "\n",
            Terminator::CrLf => "\r\n",
            Terminator::Cr => "\r",
        }
    }

    /// Conventional name: `LF`, `CRLF` or `CR`
    pub fn name(&self) -> &'static str {
        match self {
            Terminator::Lf => "LF",
            Terminator::CrLf => "CRLF",
            Terminator::Cr => "CR",
        }
    }

    /// Length of the terminator in bytes
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    /// Terminators are never empty
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Find the first terminator at or after `from`.
///
/// Returns the byte position where the terminator starts and its kind. A
/// `\r` that is the last byte of `bytes` is reported as [`Terminator::Cr`];
/// callers reading in chunks decide whether a following chunk turns it into
/// CRLF.
pub fn find_terminator(bytes: &[u8], from: usize) -> Option<(usize, Terminator)> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => return Some((i, Terminator::Lf)),
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    return Some((i, Terminator::CrLf));
                }
                return Some((i, Terminator::Cr));
            }
            _ => i += 1,
        }
    }
    None
}

/// Running tally of terminators seen, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminatorCounts {
    /// LF terminators
    pub lf: usize,
    /// CRLF terminators
    pub crlf: usize,
    /// Lone CR terminators
    pub cr: usize,
}

impl TerminatorCounts {
    /// Record one terminator
    pub fn record(&mut self, terminator: Terminator) {
        match terminator {
            Terminator::Lf => self.lf += 1,
            Terminator::CrLf => self.crlf += 1,
            Terminator::Cr => self.cr += 1,
        }
    }

    /// Reclassify a CR already counted as the first half of a CRLF
    pub(crate) fn promote_cr(&mut self) {
        self.cr = self.cr.saturating_sub(1);
        self.crlf += 1;
    }

    /// Total number of terminators
    pub fn total(&self) -> usize {
        self.lf + self.crlf + self.cr
    }

    /// The most frequent terminator, `None` when nothing was seen.
    ///
    /// Ties favor CRLF, then LF.
    pub fn predominant(&self) -> Option<Terminator> {
        if self.total() == 0 {
            return None;
        }

        if self.crlf >= self.lf && self.crlf >= self.cr {
            Some(Terminator::CrLf)
        } else if self.lf >= self.cr {
            Some(Terminator::Lf)
        } else {
            Some(Terminator::Cr)
        }
    }

    /// True when more than one kind of terminator was seen
    pub fn is_mixed(&self) -> bool {
        [self.lf, self.crlf, self.cr]
            .iter()
            .filter(|&&count| count > 0)
            .count()
            > 1
    }
}
