//! iCalendar parsing.
//!
//! - Lexer: line unfolding and content line tokenization
//! - Split: header / VEVENT components / footer partitioning

mod error;
mod lexer;
mod split;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use lexer::{ContentLine, Parameter, unescape_text, unfold, unfold_lines};
pub use split::{SplitResult, parse, split_calendar_by_uid, split_components};
