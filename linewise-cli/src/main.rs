//! Linewise command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use linewise_cli::commands::Commands;

/// Read large text files one line at a time
#[derive(Debug, Parser)]
#[command(name = "linewise", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    runtime.block_on(cli.command.execute())
}
