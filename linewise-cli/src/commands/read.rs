//! Read command implementation

use anyhow::Result;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use super::{init_logging, read_lines, InputArgs};
use crate::error::CliError;
use crate::output::{create_formatter, open_writer, OutputFormat};

/// Arguments for the read command
#[derive(Debug, Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Stop after N lines
    #[arg(long, value_name = "N")]
    pub head: Option<usize>,

    /// Prefix each line with its number (text format)
    #[arg(short, long)]
    pub number: bool,

    /// Output format (default: text)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress log output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ReadArgs {
    /// Execute the read command
    pub async fn execute(&self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        log::info!("Reading {}", self.input.path.display());
        log::debug!("Arguments: {:?}", self);

        let config = self.input.load_config()?;
        let options = self.input.reader_options(&config)?;
        let format = match self.format {
            Some(format) => format,
            None => parse_format(&config.output.format)?,
        };
        let number_lines = self.number || config.output.number_lines;

        let writer = open_writer(self.output.as_deref())?;
        let mut formatter = create_formatter(format, writer, number_lines);

        let head = self.head;
        let mut printed = 0;
        let stats = read_lines(&self.input.path, options, |line| {
            if head.is_some_and(|limit| printed >= limit) {
                return Ok(false);
            }
            printed += 1;
            formatter.format_line(printed, line)?;
            Ok(head.map_or(true, |limit| printed < limit))
        })
        .await?;

        formatter.finish()?;

        log::info!(
            "Printed {printed} lines ({} read, {} skipped)",
            stats.lines_emitted,
            stats.lines_skipped
        );
        Ok(())
    }
}

fn parse_format(name: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(name, true).map_err(|_| {
        CliError::ConfigError(format!("unknown output format '{name}' (expected text or json)"))
            .into()
    })
}
