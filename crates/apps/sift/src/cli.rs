//! Command-line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use sift::FailurePolicy;
use std::path::PathBuf;

/// Rule-driven Gmail triage
///
/// Fetches recent messages into a local database, then applies the
/// configured rules to them exactly once per (message, ruleset) pair.
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// SQLite database holding records and the processed ledger
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the newest messages into the database
    Fetch {
        /// Number of messages to fetch
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Run one rule-engine pass over the stored messages
    Process(ProcessArgs),

    /// Fetch, then process (the default)
    Run {
        /// Number of messages to fetch
        #[arg(short, long)]
        count: Option<usize>,

        #[command(flatten)]
        process: ProcessArgs,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ProcessArgs {
    /// Rules file
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// What to do when some actions of a match fail
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    /// Keep the pair processed
    #[value(name = "mark_processed")]
    MarkProcessed,
    /// Re-evaluate the pair on the next pass
    #[value(name = "retry")]
    Retry,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::MarkProcessed => FailurePolicy::MarkProcessed,
            PolicyArg::Retry => FailurePolicy::Retry,
        }
    }
}
