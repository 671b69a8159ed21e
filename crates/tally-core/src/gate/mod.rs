//! Cross-year compatibility gate
//!
//! Before a query touches data, the gate decides whether it may proceed,
//! must be stopped with an explanation, or may proceed with only the
//! files that can be compared.

mod decision;
mod detect;
mod engine;
mod source;

pub use decision::{GateDecision, GateOutcome, IncompatibleComparison, ResetReason};
pub use detect::{
    is_comparison_query, is_new_topic, mentioned_years, mentions_relative_year, normalize_query,
    overlap_ratio,
};
pub use engine::CompatibilityGate;
pub use source::CompatibilitySource;
#[cfg(test)]
pub use source::MockCompatibilitySource;
