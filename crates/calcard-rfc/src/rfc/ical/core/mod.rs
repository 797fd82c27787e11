//! iCalendar core models.

mod resource;
mod rule;
mod time;

pub use resource::{EventComponent, EventDisplay, ParsedResource};
pub use rule::{Frequency, Rule, RuleUntil, Weekday, WeekdayNum};
pub use time::{EventTime, RecurrenceId, resolve_tz};
