//! Topic mapping commands

use crate::console::CliConsole;
use crate::context::index_loader;
use tally_core::compat::format_incompatibility_advisory;
use tally_core::config::TallyConfig;

/// Print the mapping version and its topics
pub fn summary(config: &TallyConfig, verbose: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(verbose);
    let index = index_loader(config)?.get()?;

    let comparable = index.compatible_topics();
    let non_comparable = index.non_comparable_topics();

    console.print_header("Topic Mapping");
    console.print_field("Version", index.version());
    console.print_field("Comparable topics", &comparable.len().to_string());
    console.print_field("Non-comparable topics", &non_comparable.len().to_string());

    console.info("");
    for topic in non_comparable {
        let message = index.incomparable_topic_message(topic).unwrap_or_default();
        console.info(&format!("{}: {}", topic, message));
    }
    Ok(())
}

/// Resolve file ids against the mapping
pub fn lookup(config: &TallyConfig, files: &[String]) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let index = index_loader(config)?.get()?;

    console.print_header("File Lookup");
    console.print_table_header(&["File", "Topic", "Year", "Comparable"]);
    let resolved = index.lookup_files(files);
    for file in &resolved {
        let year = file.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into());
        console.print_table_row(&[
            file.file_id.as_str(),
            file.topic_id.as_str(),
            year.as_str(),
            if file.comparable { "yes" } else { "no" },
        ]);
    }

    let pairs = index.get_comparable_pairs(&resolved);
    if let Some(message) = &pairs.message {
        println!();
        console.warn(message);
    }
    Ok(())
}

/// Print an assessment and the advisory derived from it
pub fn assess(config: &TallyConfig, topics: &[String], segments: &[String]) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let metadata = index_loader(config)?.assess(topics, segments);

    console.print_json(&metadata)?;
    if let Some(advisory) = format_incompatibility_advisory(&metadata) {
        println!();
        console.warn(&advisory);
    }
    Ok(())
}
