//! Advisory text passed to the answer-generation step

use super::types::{ComparablePairs, CompatibilityMetadata};

/// Summarize the limits of a stored assessment
///
/// Returns `None` when everything assessed is comparable.
pub fn format_incompatibility_advisory(metadata: &CompatibilityMetadata) -> Option<String> {
    if let Some(error) = &metadata.error {
        return Some(format!("IMPORTANT: {}", error.message));
    }
    if metadata.is_fully_compatible {
        return None;
    }

    let mut message =
        String::from("IMPORTANT: Some data limitations apply for year-on-year comparisons.\n");

    let blocked = metadata.blocked_topics();
    if !blocked.is_empty() {
        message.push_str("\nDirect year comparison is not allowed for these topics:\n");
        for (topic, info) in blocked {
            message.push_str(&format!("- {}: {}\n", topic, info.user_message));
        }
        message.push_str(
            "Present each year's figures separately if asked, and state the comparison limitation.\n",
        );
    }

    let segments: Vec<String> = metadata
        .segment_compatibility
        .iter()
        .filter(|(_, info)| !info.comparable)
        .map(|(segment, info)| format!("- {}: {}", segment, info.user_message))
        .collect();
    if !segments.is_empty() {
        message.push_str("\nSegment limitations:\n");
        message.push_str(&segments.join("\n"));
        message.push('\n');
    }

    Some(message)
}

/// Advisory for a comparison that can only be answered in part
pub fn format_degraded_advisory(pairs: &ComparablePairs) -> String {
    let reason = pairs
        .message
        .as_deref()
        .unwrap_or("Some of the requested data cannot be compared across years.");
    format!(
        "IMPORTANT: Only part of this comparison can be answered. {} \
         The following files were excluded and must not be compared across years: {}.",
        reason,
        pairs.invalid.join(", ")
    )
}
