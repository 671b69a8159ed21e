//! Store commands

use crate::console::CliConsole;
use crate::context::AppContext;
use anyhow::bail;

/// Check that the configured store answers
pub async fn ping(ctx: &AppContext) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let backend = ctx.store.backend_type();
    if !ctx.store.ping().await {
        bail!("{} store did not answer", backend);
    }
    console.success(&format!("{} store is reachable", backend));
    Ok(())
}
