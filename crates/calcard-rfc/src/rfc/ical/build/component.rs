//! VEVENT construction from edit fields.

use calcard_core::util::uid::check_uid;
use chrono::{DateTime, Utc};

use super::escape::escape_text;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::{EventComponent, EventTime, Rule};

const STATUS_VALUES: &[&str] = &["TENTATIVE", "CONFIRMED", "CANCELLED"];
const CLASS_VALUES: &[&str] = &["PUBLIC", "PRIVATE", "CONFIDENTIAL"];
const TRANSP_VALUES: &[&str] = &["OPAQUE", "TRANSPARENT"];

/// The editable fields of one VEVENT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub uid: String,
    pub dtstamp: DateTime<Utc>,
    /// Set when building an override.
    pub recurrence_id: Option<EventTime>,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub rule: Option<Rule>,
    /// Reminder offsets in minutes before the start.
    pub reminders: Vec<u32>,
    pub organizer: Option<String>,
    pub attendees: Vec<String>,
    pub status: Option<String>,
    pub class: Option<String>,
    pub transp: Option<String>,
    pub categories: Vec<String>,
    pub url: Option<String>,
    pub attach: Option<String>,
}

impl EventFields {
    /// Minimal fields for an event starting at `start`, stamped now.
    #[must_use]
    pub fn new(uid: impl Into<String>, start: EventTime) -> Self {
        Self {
            uid: uid.into(),
            dtstamp: Utc::now(),
            recurrence_id: None,
            start,
            end: None,
            summary: None,
            location: None,
            description: None,
            rule: None,
            reminders: Vec::new(),
            organizer: None,
            attendees: Vec::new(),
            status: None,
            class: None,
            transp: None,
            categories: Vec::new(),
            url: None,
            attach: None,
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: EventTime) -> Self {
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    fn check(&self) -> RfcResult<()> {
        check_uid(&self.uid)?;

        let Some(end) = &self.end else {
            return Ok(());
        };

        if end.is_all_day() != self.start.is_all_day() {
            return Err(RfcError::validation(
                "DTSTART and DTEND must both be all-day or both be timed",
            ));
        }

        if let (Some(start), Some(end)) = (self.start.to_utc(), end.to_utc())
            && end < start
        {
            return Err(RfcError::validation("DTEND is before DTSTART"));
        }

        Ok(())
    }
}

/// ## Summary
/// Normalizes an address into a `mailto:` URI.
///
/// Accepts a bare address or one already prefixed with `mailto:`. Returns
/// `None` for anything that is not a plausible single address.
#[must_use]
pub fn normalize_mailto(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let address = match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("mailto:") => &trimmed[7..],
        _ => trimmed,
    };

    let (local, domain) = address.split_once('@')?;
    let forbidden = |c: char| c.is_whitespace() || c.is_control() || "@;:,<>\"\\".contains(c);
    let valid = !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !local.contains(forbidden)
        && !domain.contains(forbidden);

    valid.then(|| format!("mailto:{address}"))
}

fn enumerated(name: &str, value: Option<&str>, allowed: &[&str]) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let upper = value.to_ascii_uppercase();
    if allowed.contains(&upper.as_str()) {
        Some(format!("{name}:{upper}"))
    } else {
        tracing::debug!(property = name, value, "Dropping invalid enumerated value");
        None
    }
}

fn uri(name: &str, value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let valid = ["http://", "https://"].iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(scheme))
            && value.len() > scheme.len()
    }) && !value.contains(char::is_whitespace);

    if valid {
        Some(format!("{name}:{value}"))
    } else {
        tracing::debug!(property = name, value, "Dropping invalid URI");
        None
    }
}

fn text(name: &str, value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| format!("{name}:{}", escape_text(v)))
}

/// ## Summary
/// Builds the content lines of one VEVENT from edit fields.
///
/// Properties come out in a fixed order with VALARM blocks last. Optional
/// properties that are syntactically invalid are dropped, never reported.
///
/// ## Errors
/// Returns a validation error for an empty UID or one holding control
/// characters, an end before the start, or
/// a start and end that disagree on being all-day.
pub fn build_component(fields: &EventFields) -> RfcResult<EventComponent> {
    fields.check()?;

    let mut lines = vec![
        format!("UID:{}", fields.uid.trim()),
        format!("DTSTAMP:{}", fields.dtstamp.format("%Y%m%dT%H%M%SZ")),
    ];

    if let Some(recurrence_id) = &fields.recurrence_id {
        lines.push(recurrence_id.to_property("RECURRENCE-ID"));
    }
    lines.push(fields.start.to_property("DTSTART"));
    if let Some(end) = &fields.end {
        lines.push(end.to_property("DTEND"));
    }

    lines.extend(text("SUMMARY", fields.summary.as_deref()));
    lines.extend(text("LOCATION", fields.location.as_deref()));
    lines.extend(text("DESCRIPTION", fields.description.as_deref()));

    if let Some(rule) = &fields.rule {
        lines.push(format!("RRULE:{rule}"));
    }

    lines.extend(enumerated("STATUS", fields.status.as_deref(), STATUS_VALUES));
    lines.extend(enumerated("CLASS", fields.class.as_deref(), CLASS_VALUES));
    lines.extend(enumerated("TRANSP", fields.transp.as_deref(), TRANSP_VALUES));

    let categories: Vec<String> = fields
        .categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(escape_text)
        .collect();
    if !categories.is_empty() {
        lines.push(format!("CATEGORIES:{}", categories.join(",")));
    }

    lines.extend(uri("URL", fields.url.as_deref()));
    lines.extend(uri("ATTACH", fields.attach.as_deref()));

    if let Some(organizer) = fields.organizer.as_deref() {
        match normalize_mailto(organizer) {
            Some(mailto) => lines.push(format!("ORGANIZER:{mailto}")),
            None => tracing::debug!(organizer, "Dropping invalid organizer address"),
        }
    }
    for attendee in &fields.attendees {
        match normalize_mailto(attendee) {
            Some(mailto) => lines.push(format!(
                "ATTENDEE;ROLE=REQ-PARTICIPANT;PARTSTAT=NEEDS-ACTION:{mailto}"
            )),
            None => tracing::debug!(attendee, "Dropping invalid attendee address"),
        }
    }

    for minutes in &fields.reminders {
        lines.extend([
            "BEGIN:VALARM".to_string(),
            "ACTION:DISPLAY".to_string(),
            "DESCRIPTION:Reminder".to_string(),
            format!("TRIGGER:-PT{minutes}M"),
            "END:VALARM".to_string(),
        ]);
    }

    Ok(EventComponent::new(lines))
}
