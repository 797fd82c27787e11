use chrono::{DateTime, Utc};

use crate::rfc::ical::core::{EventComponent, ParsedResource, Rule};

/// ## Summary
/// Parses the RRULE of a component.
///
/// Returns `None` when there is no RRULE. A malformed RRULE is logged and
/// also yields `None`, so the component is treated as non-recurring.
#[must_use]
pub fn parse_rule(component: &EventComponent) -> Option<Rule> {
    let property = component.property("RRULE")?;
    match Rule::parse(property.value.trim(), 0) {
        Ok(rule) => Some(rule),
        Err(error) => {
            tracing::warn!(
                uid = component.uid().unwrap_or_default(),
                %error,
                "Ignoring malformed RRULE"
            );
            None
        }
    }
}

/// ## Summary
/// Tests whether a resource can intersect `[window_start, window_end)`.
///
/// A non-recurring resource matches when its DTSTART lies in the window. A
/// recurring one matches when it starts no later than the window end and its
/// UNTIL, if any, is not before the window start. BYxxx parts and COUNT are
/// not evaluated, so recurring results are an upper bound.
///
/// The master's DTSTART is used, or the first component's when the master is
/// missing. A resource without a usable DTSTART never matches.
#[must_use]
pub fn overlaps(
    resource: &ParsedResource,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    let Some(component) = resource.representative() else {
        return false;
    };
    let Some(dtstart) = component
        .time_property("DTSTART")
        .ok()
        .flatten()
        .and_then(|t| t.to_utc())
    else {
        return false;
    };

    match parse_rule(component) {
        None => window_start <= dtstart && dtstart < window_end,
        Some(rule) => {
            dtstart <= window_end
                && rule
                    .until
                    .is_none_or(|until| until.last_instant() >= window_start)
        }
    }
}
