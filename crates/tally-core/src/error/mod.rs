//! Error types for Tally
//!
//! Infrastructure faults (storage, parsing) are absorbed by the cache and
//! gate layers. `TallyError` is what the fallible building blocks return
//! before that absorption happens, and what loaders and the CLI surface.

mod constructors;
mod conversions;
mod types;

pub use types::{TallyError, TallyResult};
