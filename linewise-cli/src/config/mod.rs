//! Configuration module
//!
//! An optional TOML file supplies defaults; command-line flags override it.
//!
//! ```toml
//! [reader]
//! encoding = "latin1"
//! skip_empty_lines = true
//! chunk_size_kb = 16
//! strip_bom = false
//!
//! [output]
//! format = "json"
//! number_lines = false
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use linewise_engine::{ReaderOptions, DEFAULT_CHUNK_SIZE, DEFAULT_ENCODING};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// CLI configuration structure
#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct CliConfig {
    /// Reader configuration
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Reader-related configuration
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Encoding label used to decode input files
    pub encoding: String,

    /// Drop zero-length lines
    pub skip_empty_lines: bool,

    /// Chunk size for reading (KB)
    pub chunk_size_kb: usize,

    /// Drop a leading byte order mark
    pub strip_bom: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            encoding: DEFAULT_ENCODING.to_string(),
            skip_empty_lines: false,
            chunk_size_kb: DEFAULT_CHUNK_SIZE / 1024,
            strip_bom: false,
        }
    }
}

impl ReaderConfig {
    /// Reader options described by this table
    pub fn to_options(&self) -> ReaderOptions {
        ReaderOptions {
            encoding: self.encoding.clone(),
            skip_empty_lines: self.skip_empty_lines,
            chunk_size: self.chunk_size_kb.saturating_mul(1024),
            strip_bom: self.strip_bom,
        }
    }
}

/// Output-related configuration
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (`text` or `json`)
    pub format: String,

    /// Prefix text output with line numbers
    pub number_lines: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            number_lines: false,
        }
    }
}

impl CliConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = toml::from_str(&content).map_err(|err| {
            CliError::ConfigError(format!("{}: {}", path.display(), err.message()))
        })?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
