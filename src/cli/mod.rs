//! CLI Module
//!
//! Command-line harness for the Emotive pipeline: replays frames through a
//! pipeline, then summarizes and exports the resulting session.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Emotive - live facial emotion sampling and session reports
#[derive(Parser, Debug)]
#[command(name = "emotive")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay frames through a pipeline and export the session
    #[command(name = "run")]
    Run(RunArgs),

    /// Print the summary of a saved session ledger
    #[command(name = "summarize")]
    Summarize {
        /// Ledger JSON written by `run`
        ledger: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export CSV and PDF reports from a saved session ledger
    #[command(name = "export")]
    Export {
        /// Ledger JSON written by `run`
        ledger: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "emotive-out")]
        output: PathBuf,

        /// Pipeline config supplying export options
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List known emotion labels and registered classifiers
    #[command(name = "labels")]
    Labels,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory of still images replayed as frames in file-name order
    #[arg(short, long)]
    pub frames: Option<PathBuf>,

    /// Number of synthetic frames when no directory is given
    #[arg(long, default_value_t = 300)]
    pub synthetic: u64,

    /// Pipeline config (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Classifier ID, overriding the config
    #[arg(long)]
    pub classifier: Option<String>,

    /// Sample every Nth frame, overriding the config
    #[arg(short, long)]
    pub stride: Option<u32>,

    /// Directory for the ledger and reports
    #[arg(short, long, default_value = "emotive-out")]
    pub output: PathBuf,

    /// Also write every annotated frame as PNG into this directory
    #[arg(long)]
    pub annotated: Option<PathBuf>,
}
