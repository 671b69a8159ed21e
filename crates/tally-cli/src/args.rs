//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Tally - thread-scoped survey data cache with cross-year compatibility gating")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (defaults to ~/.tally/config.toml)
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Topic mapping file, overriding the configured one
    #[arg(long, global = true)]
    pub mapping: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a query against the compatibility gate
    Gate {
        /// The user query
        query: String,

        /// Thread whose cached files join the check
        #[arg(long)]
        thread: Option<String>,

        /// Candidate file ids, comma separated
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and manage thread caches
    Thread {
        #[command(subcommand)]
        action: ThreadAction,
    },

    /// Query the topic mapping
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },

    /// Key-value store utilities
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand, Clone)]
pub enum ThreadAction {
    /// Summarize a thread's cached state
    Show { thread_id: String },
    /// Clear a thread's compatibility metadata
    Reset { thread_id: String },
    /// Copy a thread's cache to a new thread id
    CarryForward { from: String, to: String },
}

#[derive(Subcommand, Clone)]
pub enum MappingAction {
    /// Version and topic counts
    Summary,
    /// Resolve file ids to topics
    Lookup {
        #[arg(required = true, value_delimiter = ',')]
        files: Vec<String>,
    },
    /// Assess topics and segments
    Assess {
        #[arg(long, value_delimiter = ',')]
        topics: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        segments: Vec<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum StoreAction {
    /// Check that the store answers
    Ping,
}
