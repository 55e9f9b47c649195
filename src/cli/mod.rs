//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Crucible: autonomous ML engineering pipeline.
#[derive(Parser, Debug)]
#[command(name = "crucible", version, about)]
pub struct Cli {
    /// Path to a configuration file (defaults to `crucible.yaml`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline for a task
    Run(commands::run::RunArgs),
    /// Show the resolved configuration
    Config(commands::config::ConfigArgs),
}

/// Print a fatal error to stderr and exit non-zero.
pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {err:#}", console::style("error:").red().bold());
    std::process::exit(1);
}
