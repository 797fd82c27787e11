//! iCalendar serialization.
//!
//! - Escape: TEXT value escaping
//! - Fold: content line folding at 75 octets
//! - Component: VEVENT construction from edit fields
//! - Serializer: resource serialization with CRLF line endings

mod component;
mod escape;
mod fold;
mod serializer;

pub use component::{EventFields, build_component, normalize_mailto};
pub use escape::escape_text;
pub use fold::fold_line;
pub use serializer::serialize;
