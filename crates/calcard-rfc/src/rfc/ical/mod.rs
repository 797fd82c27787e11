//! iCalendar resource handling (RFC 5545).
//!
//! A calendar resource is kept close to its text form: a header (the
//! VCALENDAR properties and any non-event components), an ordered list of
//! VEVENT components and a footer. Editing replaces whole components, so
//! properties this crate does not understand survive every write.

pub mod build;
pub mod core;
pub mod parse;
pub mod recurrence;
pub mod series;
