//! A calendar resource split into header, VEVENT components and footer.

use serde::Serialize;

use super::EventTime;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::parse::ContentLine;

/// One VEVENT, held as its unfolded content lines without the surrounding
/// `BEGIN:VEVENT` / `END:VEVENT`. Nested blocks such as VALARM are kept
/// inline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventComponent {
    pub lines: Vec<String>,
}

impl EventComponent {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Iterates over the component's own properties, skipping lines inside
    /// nested sub-components. Lines that do not parse are skipped.
    pub fn properties(&self) -> impl Iterator<Item = ContentLine> + '_ {
        let mut depth = 0usize;
        self.lines.iter().enumerate().filter_map(move |(i, line)| {
            let parsed = ContentLine::parse(line, i + 1).ok()?;
            match parsed.name.as_str() {
                "BEGIN" => {
                    depth += 1;
                    None
                }
                "END" => {
                    depth = depth.saturating_sub(1);
                    None
                }
                _ if depth == 0 => Some(parsed),
                _ => None,
            }
        })
    }

    /// Returns the first top-level property with the given name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<ContentLine> {
        self.properties().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns every top-level property with the given name.
    #[must_use]
    pub fn properties_named(&self, name: &str) -> Vec<ContentLine> {
        self.properties()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect()
    }

    #[must_use]
    pub fn uid(&self) -> Option<String> {
        self.property("UID").map(|p| p.value.trim().to_string())
    }

    /// The RECURRENCE-ID value as written, if this is an override.
    #[must_use]
    pub fn recurrence_id_value(&self) -> Option<String> {
        self.property("RECURRENCE-ID")
            .map(|p| p.value.trim().to_string())
    }

    /// Whether this is the series master (no RECURRENCE-ID).
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.property("RECURRENCE-ID").is_none()
    }

    /// Parses the named date property (DTSTART, DTEND, RECURRENCE-ID).
    ///
    /// ## Errors
    /// Returns an error if the property is present but malformed.
    pub fn time_property(&self, name: &str) -> RfcResult<Option<EventTime>> {
        self.property(name)
            .map(|p| EventTime::from_content_line(&p, 0))
            .transpose()
    }

    /// Parses every value of every property with the given name (EXDATE, RDATE).
    ///
    /// ## Errors
    /// Returns an error on the first malformed value.
    pub fn time_list(&self, name: &str) -> RfcResult<Vec<EventTime>> {
        let mut values = Vec::new();
        for property in self.properties_named(name) {
            values.extend(EventTime::list_from_content_line(&property, 0)?);
        }
        Ok(values)
    }

    /// Returns a copy with `line` added after the last top-level property,
    /// ahead of any nested sub-component.
    #[must_use]
    pub fn with_property_line(&self, line: String) -> Self {
        let insert_at = self
            .lines
            .iter()
            .position(|l| l.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("BEGIN:")))
            .unwrap_or(self.lines.len());
        let mut lines = self.lines.clone();
        lines.insert(insert_at, line);
        Self { lines }
    }
}

/// Display fields cached alongside a stored calendar resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EventDisplay {
    pub summary: Option<String>,
    pub dtstart: Option<EventTime>,
    pub dtend: Option<EventTime>,
    pub all_day: bool,
}

/// A calendar resource: VCALENDAR header lines, VEVENT components in
/// document order and footer lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedResource {
    pub header: Vec<String>,
    pub components: Vec<EventComponent>,
    pub footer: Vec<String>,
}

impl ParsedResource {
    /// A new, empty resource with a standard VCALENDAR wrapper.
    #[must_use]
    pub fn with_default_wrapper(prodid: &str) -> Self {
        Self {
            header: vec![
                "BEGIN:VCALENDAR".to_string(),
                "VERSION:2.0".to_string(),
                format!("PRODID:{prodid}"),
                "CALSCALE:GREGORIAN".to_string(),
            ],
            components: Vec::new(),
            footer: vec!["END:VCALENDAR".to_string()],
        }
    }

    /// Returns a copy carrying `components` in place of the current ones.
    #[must_use]
    pub fn with_components(&self, components: Vec<EventComponent>) -> Self {
        Self {
            header: self.header.clone(),
            components,
            footer: self.footer.clone(),
        }
    }

    /// The series master, if present.
    #[must_use]
    pub fn master(&self) -> Option<&EventComponent> {
        self.components.iter().find(|c| c.is_master())
    }

    /// Overrides (components carrying RECURRENCE-ID).
    pub fn overrides(&self) -> impl Iterator<Item = &EventComponent> {
        self.components.iter().filter(|c| !c.is_master())
    }

    /// The master, or the first component when the master is missing.
    #[must_use]
    pub fn representative(&self) -> Option<&EventComponent> {
        self.master().or_else(|| self.components.first())
    }

    /// The UID shared by all components.
    #[must_use]
    pub fn uid(&self) -> Option<String> {
        self.representative().and_then(EventComponent::uid)
    }

    /// ## Summary
    /// Checks the invariants of a stored resource.
    ///
    /// - the VCALENDAR wrapper is present
    /// - at least one VEVENT, each with a UID, all UIDs equal
    /// - at most one component without RECURRENCE-ID
    /// - RECURRENCE-ID values are distinct
    ///
    /// ## Errors
    /// Returns a validation error naming the first violated invariant.
    pub fn validate(&self) -> RfcResult<()> {
        let wrapped = self
            .header
            .first()
            .is_some_and(|l| l.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
            && self
                .footer
                .last()
                .is_some_and(|l| l.eq_ignore_ascii_case("END:VCALENDAR"));
        if !wrapped {
            return Err(RfcError::validation("resource is not wrapped in VCALENDAR"));
        }

        if self.components.is_empty() {
            return Err(RfcError::validation("resource contains no VEVENT"));
        }

        let mut uid: Option<String> = None;
        let mut masters = 0usize;
        let mut recurrence_ids: Vec<String> = Vec::new();

        for component in &self.components {
            let component_uid = component
                .uid()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| RfcError::validation("VEVENT without UID"))?;
            match &uid {
                Some(existing) if *existing != component_uid => {
                    return Err(RfcError::validation(format!(
                        "UID mismatch: '{existing}' and '{component_uid}' in one resource"
                    )));
                }
                Some(_) => {}
                None => uid = Some(component_uid),
            }

            match component.recurrence_id_value() {
                None => masters += 1,
                Some(rid) if recurrence_ids.contains(&rid) => {
                    return Err(RfcError::validation(format!(
                        "duplicate RECURRENCE-ID '{rid}'"
                    )));
                }
                Some(rid) => recurrence_ids.push(rid),
            }

            component.time_property("DTSTART")?;
            component.time_property("DTEND")?;
            component.time_property("RECURRENCE-ID")?;
        }

        if masters > 1 {
            return Err(RfcError::validation(
                "more than one VEVENT without RECURRENCE-ID",
            ));
        }

        Ok(())
    }

    /// Derives the cached display fields from the representative component.
    ///
    /// Malformed date values are left out rather than reported; `validate`
    /// is the place that rejects them.
    #[must_use]
    pub fn display(&self) -> EventDisplay {
        let Some(component) = self.representative() else {
            return EventDisplay::default();
        };

        let dtstart = component.time_property("DTSTART").ok().flatten();
        let dtend = component.time_property("DTEND").ok().flatten();
        let all_day = dtstart.as_ref().is_some_and(EventTime::is_all_day);

        EventDisplay {
            summary: component.property("SUMMARY").map(|p| p.text()),
            dtstart,
            dtend,
            all_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(lines: &[&str]) -> EventComponent {
        EventComponent::new(lines.iter().map(ToString::to_string).collect())
    }

    fn wrapped(components: Vec<EventComponent>) -> ParsedResource {
        ParsedResource::with_default_wrapper("-//Test//EN").with_components(components)
    }

    #[test]
    fn nested_alarm_properties_are_not_top_level() {
        let event = component(&[
            "UID:1",
            "BEGIN:VALARM",
            "DESCRIPTION:alarm text",
            "END:VALARM",
        ]);
        assert!(event.property("DESCRIPTION").is_none());
        assert_eq!(event.uid().as_deref(), Some("1"));
    }

    #[test]
    fn property_line_goes_before_alarm() {
        let event = component(&["UID:1", "BEGIN:VALARM", "END:VALARM"]);
        let updated = event.with_property_line("EXDATE:20250120T100000Z".to_string());
        assert_eq!(updated.lines[1], "EXDATE:20250120T100000Z");
        assert_eq!(event.lines.len(), 3);
    }

    #[test]
    fn validate_accepts_series() {
        let resource = wrapped(vec![
            component(&["UID:evt1", "DTSTART:20250106T100000Z", "RRULE:FREQ=WEEKLY"]),
            component(&["UID:evt1", "RECURRENCE-ID:20250113T100000Z", "DTSTART:20250113T120000Z"]),
        ]);
        assert!(resource.validate().is_ok());
    }

    #[test]
    fn validate_rejects_invariant_violations() {
        let cases = [
            wrapped(vec![]),
            wrapped(vec![component(&["SUMMARY:no uid"])]),
            wrapped(vec![component(&["UID:a"]), component(&["UID:b", "RECURRENCE-ID:20250101"])]),
            wrapped(vec![component(&["UID:a"]), component(&["UID:a"])]),
            wrapped(vec![
                component(&["UID:a", "RECURRENCE-ID:20250101"]),
                component(&["UID:a", "RECURRENCE-ID:20250101"]),
            ]),
            wrapped(vec![component(&["UID:a", "DTSTART:notadate"])]),
        ];
        for resource in cases {
            assert!(resource.validate().is_err(), "{resource:?}");
        }
    }

    #[test]
    fn validate_requires_wrapper() {
        let resource = ParsedResource {
            header: vec![],
            components: vec![component(&["UID:a"])],
            footer: vec![],
        };
        assert!(matches!(resource.validate(), Err(RfcError::Validation(_))));
    }

    #[test]
    fn display_prefers_master() {
        let resource = wrapped(vec![
            component(&["UID:a", "RECURRENCE-ID:20250113", "SUMMARY:Override"]),
            component(&["UID:a", "DTSTART;VALUE=DATE:20250106", "SUMMARY:Weekly\\, all day"]),
        ]);
        let display = resource.display();
        assert_eq!(display.summary.as_deref(), Some("Weekly, all day"));
        assert!(display.all_day);
    }

    #[test]
    fn display_falls_back_to_first_override() {
        let resource = wrapped(vec![component(&[
            "UID:a",
            "RECURRENCE-ID:20250113T100000Z",
            "SUMMARY:Only override",
        ])]);
        assert_eq!(resource.display().summary.as_deref(), Some("Only override"));
    }
}
