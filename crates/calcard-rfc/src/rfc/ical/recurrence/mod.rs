//! Recurrence evaluation.
//!
//! - Overlap: the coarse series-level window test used for range filtering
//! - Expand: bounded occurrence expansion through the `rrule` crate

mod expand;
mod overlap;

pub use expand::{Occurrence, expand_occurrences};
pub use overlap::{overlaps, parse_rule};
