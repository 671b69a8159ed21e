//! Thread cache commands

use crate::console::CliConsole;
use crate::context::AppContext;
use anyhow::bail;

/// Summarize a thread's cached state
pub async fn show(ctx: &AppContext, thread_id: &str) -> anyhow::Result<()> {
    let console = CliConsole::new(true);

    let Some(summary) = ctx.threads.summary(thread_id).await else {
        console.warn(&format!("No cached data for thread {}", thread_id));
        return Ok(());
    };

    console.print_header(&format!("Thread {}", thread_id));
    console.print_field("Files", &summary.file_ids.len().to_string());
    for (file_id, segments) in &summary.loaded_segments {
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        console.print_field(&format!("  {}", file_id), &segments.join(", "));
    }
    console.print_field("History", &summary.history_length.to_string());
    let compatibility = match summary.is_fully_compatible {
        Some(true) => "fully compatible".to_string(),
        Some(false) => "limited".to_string(),
        None => "not assessed".to_string(),
    };
    console.print_field("Compatibility", &compatibility);
    if let Some(version) = &summary.mapping_version {
        console.print_field("Mapping version", version);
    }
    if summary.cache_error_count > 0 {
        console.warn(&format!(
            "{} cache errors recorded for this thread",
            summary.cache_error_count
        ));
    }
    console.print_field("Last updated", &summary.last_updated.to_rfc3339());
    Ok(())
}

/// Clear a thread's compatibility metadata
pub async fn reset(ctx: &AppContext, thread_id: &str) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    if !ctx.threads.reset_compatibility(thread_id).await {
        bail!("Thread {} has no cached data to reset", thread_id);
    }
    console.success(&format!("Cleared compatibility metadata for thread {}", thread_id));
    Ok(())
}

/// Copy a thread's cache under a new id
pub async fn carry_forward(ctx: &AppContext, from: &str, to: &str) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    if !ctx.threads.carry_forward(from, to).await {
        bail!("Failed to carry thread {} forward to {}", from, to);
    }
    console.success(&format!("Copied thread {} to {}", from, to));
    Ok(())
}
