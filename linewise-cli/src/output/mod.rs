//! Output formatting module

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Format and output a single line; `number` counts from 1
    fn format_line(&mut self, number: usize, line: &str) -> Result<()>;

    /// Flush anything still buffered
    fn finish(&mut self) -> Result<()>;
}

pub mod json;
pub mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// The lines themselves, one per line
    Text,
    /// One JSON object per line
    Json,
}

/// Buffered writer for `path`, or stdout when no path is given
pub fn open_writer(path: Option<&Path>) -> Result<Box<dyn Write + Send + Sync>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Formatter for `format` writing to `writer`
pub fn create_formatter<W: Write + Send + Sync + 'static>(
    format: OutputFormat,
    writer: W,
    number_lines: bool,
) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(writer, number_lines)),
        OutputFormat::Json => Box::new(JsonFormatter::new(writer)),
    }
}
