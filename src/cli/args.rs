//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{completions::CompletionsArgs, init::InitArgs, run::RunArgs};

#[derive(Parser)]
#[command(name = "refload")]
#[command(author, version, about = "Bulk loader for bibliographic reference associations")]
#[command(
    long_about = "Validates tab-delimited reference-association records against a curation store and emits a pipe-delimited bulk-load file for high-throughput import."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format for the run summary
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate an input file and load the accepted records
    Run(RunArgs),

    /// Create an empty store with the loader schema
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Styled terminal summary
    #[default]
    Text,
    /// JSON summary (for programming)
    Json,
}
