//! Encoding label resolution
//!
//! Labels are resolved with the WHATWG rules implemented by `encoding_rs`,
//! after mapping the short aliases commonly used for file encodings
//! (`utf8`, `ucs2`, `utf16le`, `latin1`, `binary`, `ascii`).
//!
//! `latin1` and `binary` are true ISO-8859-1: every byte becomes the code
//! point of the same value. The WHATWG labels `iso-8859-1` and
//! `windows-1252` keep their web meaning and decode 0x80..0x9F as
//! windows-1252 punctuation.

use crate::error::{ReaderError, Result};
use encoding_rs::Encoding;

/// Label used when the caller does not pick one
pub const DEFAULT_ENCODING: &str = "utf8";

/// A resolved text encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// One byte per code point, U+0000..U+00FF
    Latin1,
    /// Latin-1 with the high bit of every byte cleared
    Ascii,
    /// Any encoding `encoding_rs` implements
    Whatwg(&'static Encoding),
}

impl TextEncoding {
    /// Canonical name, for logs
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Whatwg(encoding) => encoding.name(),
        }
    }
}

impl From<&'static Encoding> for TextEncoding {
    fn from(encoding: &'static Encoding) -> Self {
        TextEncoding::Whatwg(encoding)
    }
}

/// Resolve an encoding label to a [`TextEncoding`].
///
/// Matching is case-insensitive and ignores surrounding whitespace. Labels
/// that name binary-to-text schemes (`base64`, `hex`) or map to the WHATWG
/// replacement encoding are rejected.
pub fn resolve_encoding(label: &str) -> Result<TextEncoding> {
    let normalized = label.trim().to_ascii_lowercase();

    let alias = match normalized.as_str() {
        "latin1" | "binary" => return Ok(TextEncoding::Latin1),
        "ascii" => return Ok(TextEncoding::Ascii),
        "utf8" | "utf-8" => Some(encoding_rs::UTF_8),
        "ucs2" | "ucs-2" | "utf16le" | "utf-16le" => Some(encoding_rs::UTF_16LE),
        "utf16be" | "utf-16be" => Some(encoding_rs::UTF_16BE),
        _ => None,
    };

    alias
        .or_else(|| Encoding::for_label(normalized.as_bytes()))
        .filter(|encoding| *encoding != encoding_rs::REPLACEMENT)
        .map(TextEncoding::Whatwg)
        .ok_or_else(|| ReaderError::UnsupportedEncoding {
            label: label.to_string(),
        })
}
