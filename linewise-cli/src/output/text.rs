//! Plain text output formatter

use super::OutputFormatter;
use anyhow::Result;
use std::io::Write;

/// Plain text formatter - writes each line back out, LF-terminated
pub struct TextFormatter<W: Write> {
    writer: W,
    number_lines: bool,
}

impl<W: Write> TextFormatter<W> {
    /// Create a new text formatter
    pub fn new(writer: W, number_lines: bool) -> Self {
        Self {
            writer,
            number_lines,
        }
    }
}

impl<W: Write + Send + Sync> OutputFormatter for TextFormatter<W> {
    fn format_line(&mut self, number: usize, line: &str) -> Result<()> {
        if self.number_lines {
            writeln!(self.writer, "{number:>6}\t{line}")?;
        } else {
            writeln!(self.writer, "{line}")?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
