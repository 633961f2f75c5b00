//! Reader configuration

use crate::encoding::{resolve_encoding, DEFAULT_ENCODING};
use crate::error::{ReaderError, Result};

/// Default number of bytes requested from the source per chunk (64KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Options recognized by a line reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Encoding label used to decode the file (default `"utf8"`)
    pub encoding: String,
    /// Suppress `line` events for zero-length lines
    pub skip_empty_lines: bool,
    /// Bytes requested from the source per chunk
    pub chunk_size: usize,
    /// Drop a leading byte order mark instead of reporting it as U+FEFF
    pub strip_bom: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            encoding: DEFAULT_ENCODING.to_string(),
            skip_empty_lines: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            strip_bom: false,
        }
    }
}

impl ReaderOptions {
    /// Create a builder
    pub fn builder() -> ReaderOptionsBuilder {
        ReaderOptionsBuilder::default()
    }

    /// Check that the options can be used to open a reader
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ReaderError::Config(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        resolve_encoding(&self.encoding)?;
        Ok(())
    }
}

/// Builder for [`ReaderOptions`]
#[derive(Debug, Default)]
pub struct ReaderOptionsBuilder {
    options: ReaderOptions,
}

impl ReaderOptionsBuilder {
    /// Set the encoding label
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.options.encoding = label.into();
        self
    }

    /// Skip zero-length lines
    pub fn skip_empty_lines(mut self, skip: bool) -> Self {
        self.options.skip_empty_lines = skip;
        self
    }

    /// Set the chunk size in bytes
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.options.chunk_size = size;
        self
    }

    /// Drop a leading byte order mark
    pub fn strip_bom(mut self, strip: bool) -> Self {
        self.options.strip_bom = strip;
        self
    }

    /// Build the options
    pub fn build(self) -> Result<ReaderOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ReaderOptions::default();
        assert_eq!(options.encoding, "utf8");
        assert!(!options.skip_empty_lines);
        assert_eq!(options.chunk_size, 64 * 1024);
        assert!(!options.strip_bom);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = ReaderOptions::builder()
            .encoding("latin1")
            .skip_empty_lines(true)
            .chunk_size(16)
            .strip_bom(true)
            .build()
            .unwrap();

        assert_eq!(options.encoding, "latin1");
        assert!(options.skip_empty_lines);
        assert_eq!(options.chunk_size, 16);
        assert!(options.strip_bom);
    }

    #[test]
    fn test_builder_rejects_zero_chunk_size() {
        let err = ReaderOptions::builder().chunk_size(0).build().unwrap_err();
        assert!(matches!(err, ReaderError::Config(_)));
    }

    #[test]
    fn test_builder_rejects_unknown_encoding() {
        let err = ReaderOptions::builder()
            .encoding("base64")
            .build()
            .unwrap_err();
        assert!(matches!(err, ReaderError::UnsupportedEncoding { .. }));
    }
}
