use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::overlap::parse_rule;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::{
    EventComponent, EventTime, ParsedResource, RuleUntil, resolve_tz,
};
use crate::rfc::ical::parse::{ParseError, ParseErrorKind};

/// One visible instance of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// The instance's RECURRENCE-ID in the master's form; `None` for a
    /// non-recurring event.
    pub recurrence_id: Option<EventTime>,
    /// Whether an override supplied this instance.
    pub overridden: bool,
    pub summary: Option<String>,
}

fn intersects(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    start < window_end && (end > window_start || start >= window_start)
}

/// `at` shifted by `span`, clamped to the representable range.
fn saturating_add(at: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    at.checked_add_signed(span).unwrap_or(if span < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Length of a component, from DTEND, else one day for all-day events and
/// zero otherwise.
fn duration_of(component: &EventComponent, start: &EventTime) -> Duration {
    let end = component
        .time_property("DTEND")
        .ok()
        .flatten()
        .and_then(|end| end.to_utc());
    match (start.to_utc(), end) {
        (Some(start), Some(end)) if end >= start => end - start,
        _ if start.is_all_day() => Duration::days(1),
        _ => Duration::zero(),
    }
}

/// Expresses `at` in the same form as the master's DTSTART.
fn instance_id(form: &EventTime, at: DateTime<Utc>) -> EventTime {
    match form {
        EventTime::Date { .. } => EventTime::date(at.date_naive()),
        EventTime::Zoned { tzid, .. } => match resolve_tz(tzid) {
            Ok(tz) => EventTime::Zoned {
                datetime: at.with_timezone(&tz).naive_local(),
                tzid: tzid.clone(),
            },
            Err(_) => EventTime::utc(at.naive_utc()),
        },
        EventTime::Floating { .. } => EventTime::Floating {
            datetime: at.naive_utc(),
        },
        EventTime::Utc { .. } => EventTime::utc(at.naive_utc()),
    }
}

/// Renders the DTSTART line handed to the `rrule` crate. All-day and
/// floating values are read as UTC, matching [`EventTime::to_utc`].
fn rrule_dtstart(start: &EventTime) -> String {
    match start {
        EventTime::Date { date } => format!("DTSTART:{}T000000Z", date.format("%Y%m%d")),
        EventTime::Zoned { tzid, .. } => format!("DTSTART;TZID={tzid}:{}", start.value_string()),
        EventTime::Utc { .. } | EventTime::Floating { .. } => {
            let value = start.value_string();
            let value = value.trim_end_matches('Z');
            format!("DTSTART:{value}Z")
        }
    }
}

fn summary_of(component: &EventComponent) -> Option<String> {
    component.property("SUMMARY").map(|p| p.text())
}

fn master_instants(
    master: &EventComponent,
    start: &EventTime,
    duration: Duration,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    max_instances: u16,
) -> RfcResult<Vec<DateTime<Utc>>> {
    let Some(first) = start.to_utc() else {
        return Ok(Vec::new());
    };

    let Some(mut rule) = parse_rule(master) else {
        return Ok(vec![first]);
    };
    // The rrule crate needs UNTIL in UTC whenever DTSTART is zoned.
    rule.until = rule
        .until
        .map(|until| RuleUntil::DateTime(until.last_instant().naive_utc()));

    let text = format!("{}\nRRULE:{rule}", rrule_dtstart(start));
    let set = text.parse::<rrule::RRuleSet>().map_err(|err| {
        RfcError::Parse(
            ParseError::new(ParseErrorKind::InvalidRRule, 0).with_context(err.to_string()),
        )
    })?;

    let lead = saturating_add(window_start, -duration);
    let after = saturating_add(lead, Duration::seconds(-1)).with_timezone(&rrule::Tz::UTC);
    let before = window_end.with_timezone(&rrule::Tz::UTC);
    let result = set.after(after).before(before).all(max_instances);
    if result.limited {
        tracing::debug!(max_instances, "Occurrence expansion hit its limit");
    }

    Ok(result
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect())
}

/// ## Summary
/// Expands a resource into the occurrences that intersect
/// `[window_start, window_end)`.
///
/// Instances generated from the master's RRULE are dropped when listed in
/// EXDATE or replaced by an override. Each override is placed by its own
/// DTSTART, falling back to its RECURRENCE-ID. At most `max_instances`
/// occurrences are returned, earliest first.
///
/// ## Errors
/// Returns an error if a date property is malformed or the `rrule` crate
/// rejects the rule.
pub fn expand_occurrences(
    resource: &ParsedResource,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    max_instances: u16,
) -> RfcResult<Vec<Occurrence>> {
    let mut occurrences = Vec::new();

    let mut overridden: HashSet<DateTime<Utc>> = HashSet::new();
    for component in resource.overrides() {
        let recurrence_id = component.time_property("RECURRENCE-ID")?;
        if let Some(instant) = recurrence_id.as_ref().and_then(EventTime::to_utc) {
            overridden.insert(instant);
        }

        let Some(start) = component.time_property("DTSTART")?.or(recurrence_id.clone()) else {
            continue;
        };
        let Some(start_utc) = start.to_utc() else {
            continue;
        };
        let end = saturating_add(start_utc, duration_of(component, &start));
        if intersects(start_utc, end, window_start, window_end) {
            occurrences.push(Occurrence {
                start: start_utc,
                end,
                recurrence_id,
                overridden: true,
                summary: summary_of(component),
            });
        }
    }

    if let Some(master) = resource.master()
        && let Some(start) = master.time_property("DTSTART")?
    {
        let duration = duration_of(master, &start);
        let recurring = master.property("RRULE").is_some();
        let excluded: HashSet<DateTime<Utc>> = master
            .time_list("EXDATE")?
            .iter()
            .filter_map(EventTime::to_utc)
            .collect();

        for instant in master_instants(
            master,
            &start,
            duration,
            window_start,
            window_end,
            max_instances,
        )? {
            if excluded.contains(&instant) || overridden.contains(&instant) {
                continue;
            }
            let end = saturating_add(instant, duration);
            if !intersects(instant, end, window_start, window_end) {
                continue;
            }
            occurrences.push(Occurrence {
                start: instant,
                end,
                recurrence_id: recurring.then(|| instance_id(&start, instant)),
                overridden: false,
                summary: summary_of(master),
            });
        }
    }

    occurrences.sort_by_key(|o| o.start);
    occurrences.truncate(usize::from(max_instances));
    Ok(occurrences)
}
