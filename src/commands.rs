//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run test documents against the interface
    Run {
        /// YAML test documents, run in order
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        /// Mode token (as configured); overrides the environment and detection
        #[arg(long)]
        mode: Option<String>,

        /// Continue with the next document after a failure
        #[arg(long)]
        keep_going: bool,

        /// Print a JSON summary of every document
        #[arg(long)]
        json: bool,
    },

    /// Inspect the baseline store
    #[command(subcommand)]
    Baseline(BaselineCommands),

    /// Print the store key for a suite/test/key triple
    Normalize {
        /// Name parts, usually suite, test and key
        #[arg(required = true)]
        parts: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum BaselineCommands {
    /// Show the recorded value of one key
    Get {
        suite: String,
        test: String,
        key: String,
    },

    /// List every key with its latest value
    List,
}
