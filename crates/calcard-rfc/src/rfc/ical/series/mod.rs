//! Scoped edits of a recurring series.
//!
//! Every operation takes the current components by reference and returns a
//! new ordered sequence. Nothing is mutated in place, so a failed edit leaves
//! the caller's resource exactly as it was.

mod editor;
mod scope;

pub use editor::{apply, exclude_occurrence, replace_master, upsert_occurrence_override};
pub use scope::{EditScope, OccurrenceTarget};
