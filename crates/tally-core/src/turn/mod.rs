//! Query turns
//!
//! A turn ties the pieces together for one user query: it decides which
//! files the query needs, asks the compatibility gate, loads only the
//! segments the thread does not already hold, and writes the result back
//! to the thread cache.

mod collaborators;
mod coordinator;
mod types;

pub use collaborators::{FileIdentification, FileIdentifier, IdentifyRequest, SegmentLoader};
#[cfg(test)]
pub use collaborators::{MockFileIdentifier, MockSegmentLoader};
pub use coordinator::TurnCoordinator;
pub use types::{DEFAULT_SEGMENT, ProcessedQuery, ProcessedQueryResult, TurnOutcome, TurnRequest};

#[cfg(test)]
mod tests;
