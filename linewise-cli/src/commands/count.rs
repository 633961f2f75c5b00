//! Count command implementation

use anyhow::Result;
use clap::Args;
use linewise_engine::ReaderStats;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use super::{init_logging, read_lines, InputArgs};

/// Arguments for the count command
#[derive(Debug, Args)]
pub struct CountArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the report as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Line and terminator counts for one file
#[derive(Debug, Serialize, PartialEq)]
pub struct CountReport {
    /// Input path as given
    pub path: String,
    /// Lines emitted
    pub lines: usize,
    /// Empty lines dropped by `--skip-empty-lines`
    pub skipped: usize,
    /// LF terminators
    pub lf: usize,
    /// CRLF terminators
    pub crlf: usize,
    /// Lone CR terminators
    pub cr: usize,
    /// Most frequent terminator, if any
    pub predominant: Option<&'static str>,
    /// More than one terminator style was seen
    pub mixed: bool,
}

impl CountReport {
    /// Build a report from a finished reader
    pub fn new(path: &Path, stats: &ReaderStats) -> Self {
        let terminators = &stats.terminators;
        Self {
            path: path.display().to_string(),
            lines: stats.lines_emitted,
            skipped: stats.lines_skipped,
            lf: terminators.lf,
            crlf: terminators.crlf,
            cr: terminators.cr,
            predominant: terminators.predominant().map(|t| t.name()),
            mixed: terminators.is_mixed(),
        }
    }

    /// Write the human-readable form
    pub fn write_text<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{} lines in {}", self.lines, self.path)?;
        if self.skipped > 0 {
            writeln!(writer, "  skipped: {}", self.skipped)?;
        }
        writeln!(writer, "  LF:      {}", self.lf)?;
        writeln!(writer, "  CRLF:    {}", self.crlf)?;
        writeln!(writer, "  CR:      {}", self.cr)?;
        if self.mixed {
            writeln!(writer, "  (mixed line endings)")?;
        }
        Ok(())
    }
}

impl CountArgs {
    /// Execute the count command
    pub async fn execute(&self) -> Result<()> {
        init_logging(self.verbose, false);
        log::debug!("Arguments: {:?}", self);

        let config = self.input.load_config()?;
        let options = self.input.reader_options(&config)?;

        let stats = read_lines(&self.input.path, options, |_| Ok(true)).await?;
        let report = CountReport::new(&self.input.path, &stats);
        log::info!("Read {} chunks", stats.chunks_read);

        let mut stdout = io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        } else {
            report.write_text(&mut stdout)?;
        }
        stdout.flush()?;
        Ok(())
    }
}
