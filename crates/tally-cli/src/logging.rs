//! Tracing subscriber setup

use tally_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter directive for the configured level
///
/// `--verbose` raises the level to debug for the tally crates only.
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        format!("{},tally_core=debug,tally=debug", config.level)
    } else {
        config.level.clone()
    }
}

/// Install the global subscriber, logging to stderr
pub fn init(config: &LoggingConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config, verbose)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {}", e);
    }
}
