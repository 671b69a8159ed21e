//! Gate command implementation

use crate::console::CliConsole;
use crate::context::AppContext;
use colored::*;
use tally_core::gate::{CompatibilityGate, GateOutcome};

/// Evaluate a query and print the decision
pub async fn evaluate(
    ctx: &AppContext,
    query: &str,
    thread_id: Option<&str>,
    files: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let gate = CompatibilityGate::new(ctx.index_loader()?, ctx.threads.clone())
        .with_config(ctx.config.gate.clone());

    let decision = gate.evaluate(query, thread_id, files).await;

    if json {
        // A blocked comparison is reported with the payload shown to users
        return match decision.incompatible_comparison() {
            Some(payload) => console.print_json(&payload),
            None => console.print_json(&decision),
        };
    }

    console.print_header("Gate Decision");
    let outcome = match decision.outcome {
        GateOutcome::Proceed => "proceed".green().bold(),
        GateOutcome::Blocked => "blocked".red().bold(),
        GateOutcome::DegradedProceed => "degraded proceed".yellow().bold(),
    };
    console.print_field("Outcome", &outcome.to_string());
    console.print_field("Comparison", &decision.is_comparison.to_string());
    console.print_field("Files", &display_list(&decision.file_ids));
    if !decision.excluded_file_ids.is_empty() {
        console.print_field("Excluded", &display_list(&decision.excluded_file_ids));
    }
    if let Some(reset) = decision.reset {
        console.print_field("Metadata reset", &format!("{:?}", reset));
    }
    if let Some(message) = &decision.message {
        println!();
        match decision.outcome {
            GateOutcome::Blocked => console.error(message),
            _ => console.warn(message),
        }
    }
    Ok(())
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
