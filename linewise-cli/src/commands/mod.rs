//! CLI command implementations

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use linewise_engine::{LineReader, ReaderError, ReaderEvent, ReaderOptions, ReaderStats};

use crate::config::CliConfig;
use crate::error::CliError;

pub mod count;
pub mod read;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the lines of a file
    Read(read::ReadArgs),

    /// Count lines and line terminators
    Count(count::CountArgs),
}

impl Commands {
    /// Execute the selected command
    pub async fn execute(&self) -> Result<()> {
        match self {
            Commands::Read(args) => args.execute().await,
            Commands::Count(args) => args.execute().await,
        }
    }
}

/// Input file and reader flags shared by every command
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Text encoding of the input (default: utf8)
    #[arg(short, long, value_name = "LABEL")]
    pub encoding: Option<String>,

    /// Drop zero-length lines
    #[arg(short, long)]
    pub skip_empty_lines: bool,

    /// Read chunk size in KB
    #[arg(long, value_name = "KB")]
    pub chunk_kb: Option<usize>,

    /// Drop a leading byte order mark
    #[arg(long)]
    pub strip_bom: bool,
}

impl InputArgs {
    /// Load the configuration file, if one was given
    pub fn load_config(&self) -> Result<CliConfig> {
        CliConfig::load_or_default(self.config.as_deref())
    }

    /// Reader options from `config`, overridden by flags
    pub fn reader_options(&self, config: &CliConfig) -> Result<ReaderOptions> {
        let mut options = config.reader.to_options();

        if let Some(encoding) = &self.encoding {
            options.encoding = encoding.clone();
        }
        if let Some(kb) = self.chunk_kb {
            options.chunk_size = kb.saturating_mul(1024);
        }
        options.skip_empty_lines |= self.skip_empty_lines;
        options.strip_bom |= self.strip_bom;

        options
            .validate()
            .map_err(|err| CliError::ConfigError(err.to_string()))?;
        Ok(options)
    }
}

/// Initialize logging based on verbosity level
pub fn init_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // A logger may already be installed when commands run in-process
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .try_init();
}

/// Read `path` to the end, handing every line to `on_line`.
///
/// Returning `Ok(false)` from `on_line` closes the reader; lines it had
/// already buffered are drained but not passed on. A reader error closes the
/// reader and is returned once it has finished. An error from `on_line` is
/// returned after the reader task has wound down.
pub async fn read_lines(
    path: &Path,
    options: ReaderOptions,
    mut on_line: impl FnMut(&str) -> Result<bool>,
) -> Result<ReaderStats> {
    let mut reader = LineReader::open(path, options);
    let handle = reader.handle();
    let mut events = reader.subscribe();
    let task = reader.spawn();

    let mut accepting = true;
    let mut failure = None;

    while let Some(event) = events.recv().await {
        match event {
            ReaderEvent::Open => log::debug!("Opened {}", path.display()),
            ReaderEvent::Line(line) if accepting => match on_line(&line) {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!("Closing {} early", path.display());
                    accepting = false;
                    handle.close();
                }
                Err(err) => {
                    handle.close();
                    // The reader drains the rest without a subscriber
                    drop(events);
                    if let Err(join) = task.await {
                        log::warn!("Reader task failed: {join}");
                    }
                    return Err(err);
                }
            },
            ReaderEvent::Line(_) => {}
            ReaderEvent::Error(err) => {
                log::debug!("Reader error: {err}");
                accepting = false;
                if failure.is_none() {
                    failure = Some(err);
                }
                handle.close();
            }
            ReaderEvent::End => break,
        }
    }

    let stats = task.await.context("Reader task failed")?;

    match failure {
        Some(err) => Err(classify_error(path, &err).into()),
        None => Ok(stats),
    }
}

fn classify_error(path: &Path, err: &ReaderError) -> CliError {
    match err.io_error().map(io::Error::kind) {
        Some(io::ErrorKind::NotFound) => CliError::FileNotFound(path.display().to_string()),
        _ => CliError::ReadError(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn input_args(path: PathBuf) -> InputArgs {
        InputArgs {
            path,
            config: None,
            encoding: None,
            skip_empty_lines: false,
            chunk_kb: None,
            strip_bom: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = CliConfig::default();
        config.reader.encoding = "latin1".to_string();
        config.reader.chunk_size_kb = 8;

        let mut args = input_args(PathBuf::from("in.txt"));
        args.encoding = Some("utf-16le".to_string());
        args.skip_empty_lines = true;

        let options = args.reader_options(&config).unwrap();
        assert_eq!(options.encoding, "utf-16le");
        assert_eq!(options.chunk_size, 8 * 1024);
        assert!(options.skip_empty_lines);
    }

    #[test]
    fn test_zero_chunk_size_is_config_error() {
        let mut args = input_args(PathBuf::from("in.txt"));
        args.chunk_kb = Some(0);

        let err = args.reader_options(&CliConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_read_lines_stops_when_asked() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.txt");
        fs::write(&path, "1\n2\n3\n4\n").unwrap();

        let mut seen = Vec::new();
        read_lines(&path, ReaderOptions::default(), |line| {
            seen.push(line.to_string());
            Ok(seen.len() < 2)
        })
        .await
        .unwrap();

        assert_eq!(seen, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_read_lines_callback_error_waits_for_reader() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.txt");
        let content: String = (0..1000).map(|i| format!("{i}\n")).collect();
        fs::write(&path, content).unwrap();

        let mut calls = 0;
        let err = read_lines(&path, ReaderOptions::default(), |_| {
            calls += 1;
            anyhow::bail!("sink closed")
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "sink closed");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_read_lines_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.txt");

        let err = read_lines(&path, ReaderOptions::default(), |_| Ok(true))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::FileNotFound(_))
        ));
    }
}
