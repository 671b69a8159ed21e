//! Configuration commands

use crate::console::CliConsole;
use tally_core::config::TallyConfig;

/// Print the effective configuration, with the store token masked
pub fn show(config: &TallyConfig) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let mut shown = config.clone();
    if shown.store.rest_token.is_some() {
        shown.store.rest_token = Some("********".to_string());
    }

    console.print_header("Configuration");
    console.print_json(&shown)
}
