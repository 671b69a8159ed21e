//! CLI console utilities

use colored::*;

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.len()).dimmed());
    }

    /// Print a labelled value
    pub fn print_field(&self, label: &str, value: &str) {
        println!("  {:<22} {}", format!("{}:", label).dimmed(), value);
    }

    pub fn print_table_header(&self, headers: &[&str]) {
        let row = headers
            .iter()
            .map(|h| format!("{:<24}", h))
            .collect::<String>();
        println!("{}", row.bold());
        println!("{}", "-".repeat(row.trim_end().len()).dimmed());
    }

    pub fn print_table_row(&self, cells: &[&str]) {
        let row = cells
            .iter()
            .map(|c| format!("{:<24}", c))
            .collect::<String>();
        println!("{}", row.trim_end());
    }

    /// Pretty-print a serializable value
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
