//! Tally CLI application
//!
//! Command-line access to the thread cache, the topic mapping and the
//! compatibility gate.
//!
//! ```bash
//! tally gate "Compare attraction factors between 2024 and 2025" --files 2024_1,2025_1
//! tally thread show <thread_id>
//! tally mapping summary
//! tally store ping
//! ```

mod args;
mod commands;
mod console;
mod context;
mod logging;
mod router;

use clap::Parser;
use tally_core::config::load_config;

pub use args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config_file.as_deref())?;
    if let Some(mapping) = &cli.mapping {
        config.compatibility.mapping_path = Some(mapping.clone());
    }

    // RUST_LOG takes precedence over the configured level
    logging::init(&config.logging, cli.verbose);

    router::route(cli, config).await
}
