//! CLI module for ScholarSynth
//!
//! Provides command-line interface parsing for the scholarsynth-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ScholarSynth - Multi-Stage Research Report Server
///
/// Decomposes research queries into sub-questions, researches them in
/// parallel and synthesizes a cited long-form report.
#[derive(Parser, Debug)]
#[command(
    name = "scholarsynth-server",
    version,
    about = "ScholarSynth - Multi-Stage Research Report Server",
    long_about = "Decomposes a research query into sub-questions, researches them in parallel\n\
                  with an LLM and synthesizes a cited markdown report.\n\n\
                  Run without arguments to start the HTTP server, or use 'research' to run one query.",
    after_help = "EXAMPLES:\n    \
                  scholarsynth-server                           # Start the server\n    \
                  scholarsynth-server --config my.toml serve    # Use a custom config file\n    \
                  scholarsynth-server research \"How do mRNA vaccines work?\"\n    \
                  scholarsynth-server config --validate         # Check the configuration"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./scholarsynth.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server until interrupted (default)
    Serve,

    /// Run a single research query in-process and print the report
    Research {
        /// The research question
        query: String,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration and report problems
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
