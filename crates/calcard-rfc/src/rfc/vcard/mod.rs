//! vCard handling (RFC 2426 / RFC 6350).
//!
//! Contacts are flat: one VCARD per resource, no recurrence. Cards are kept
//! as unfolded content lines so unknown properties survive a round trip.

mod birthday;
mod build;
mod card;
mod parse;

pub use birthday::Birthday;
pub use build::{ContactFields, build_vcard, serialize_vcard};
pub use card::{ContactDisplay, VCard};
pub use parse::{SplitVcards, parse_vcard, split_vcards};
