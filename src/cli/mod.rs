//! Command line interface for flagtrail.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// flagtrail - recent feature flag evaluations for error reports.
#[derive(Parser, Debug)]
#[command(name = "flagtrail")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "flagtrail.toml")]
    pub config: PathBuf,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Writes a default configuration file.
    Init {
        /// Target directory (default: current directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Shows the effective configuration.
    Config,

    /// Checks the configuration for problems.
    Doctor,

    /// Records flag evaluations and prints the resulting report as JSON.
    Record {
        /// Evaluations as NAME=true or NAME=false, oldest first.
        #[arg(required = true)]
        flags: Vec<String>,

        /// Report message.
        #[arg(short, long, default_value = "flagtrail report")]
        message: String,
    },

    /// Hammers one buffer with a writer thread while another thread snapshots it.
    Simulate {
        /// Number of distinct flags the writer sets.
        #[arg(short, long, default_value_t = 1_000_000)]
        writes: u64,

        /// Number of snapshots the reader takes.
        #[arg(short, long, default_value_t = 1_000)]
        snapshots: u64,

        /// Buffer capacity (default: from configuration).
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Shows version.
    Version,
}
