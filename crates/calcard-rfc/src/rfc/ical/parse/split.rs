//! Partitioning of calendar text into header, VEVENT components and footer.

use super::error::{ParseError, ParseErrorKind};
use super::lexer::unfold_lines;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::{EventComponent, ParsedResource};

/// Outcome of [`split_components`]: whatever could be recovered plus the
/// first structural error, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    pub resource: ParsedResource,
    pub error: Option<ParseError>,
}

impl SplitResult {
    /// Converts into a `Result`, rejecting partial results.
    ///
    /// ## Errors
    /// Returns the recorded parse error if the split was incomplete.
    pub fn into_result(self) -> RfcResult<ParsedResource> {
        match self.error {
            Some(err) => Err(RfcError::Parse(err)),
            None => Ok(self.resource),
        }
    }
}

fn begin_name(line: &str) -> Option<&str> {
    let (name, value) = line.split_once(':')?;
    name.eq_ignore_ascii_case("BEGIN").then_some(value.trim())
}

fn end_name(line: &str) -> Option<&str> {
    let (name, value) = line.split_once(':')?;
    name.eq_ignore_ascii_case("END").then_some(value.trim())
}

/// ## Summary
/// Splits calendar text into header, VEVENT components and footer.
///
/// Lines before the first VEVENT form the header and lines after the last
/// one the footer. Lines found between two VEVENTs (a VTIMEZONE, say) are
/// appended to the header so they keep their relative order.
///
/// Unbalanced BEGIN/END never panics: the partial result is returned with
/// `error` set, and callers must reject the write.
#[must_use]
pub fn split_components(text: &str) -> SplitResult {
    let mut resource = ParsedResource::default();
    let mut error: Option<ParseError> = None;
    let mut record = |err: ParseError| {
        if error.is_none() {
            error = Some(err);
        }
    };

    let mut current: Option<EventComponent> = None;
    // Nested sub-components open inside the current VEVENT.
    let mut nested: Vec<String> = Vec::new();
    let mut between: Vec<String> = Vec::new();
    let mut seen_event = false;
    let mut last_line = 0;

    for (line_num, line) in unfold_lines(text) {
        last_line = line_num;

        if let Some(name) = begin_name(&line) {
            if name.eq_ignore_ascii_case("VEVENT") {
                if let Some(open) = current.take() {
                    record(
                        ParseError::new(ParseErrorKind::UnexpectedBegin, line_num)
                            .with_context("VEVENT inside VEVENT"),
                    );
                    resource.components.push(open);
                    nested.clear();
                }
                resource.header.append(&mut between);
                current = Some(EventComponent::default());
                continue;
            }
            if let Some(open) = current.as_mut() {
                nested.push(name.to_ascii_uppercase());
                open.lines.push(line);
                continue;
            }
        }

        if let Some(name) = end_name(&line) {
            if name.eq_ignore_ascii_case("VEVENT") {
                match current.take() {
                    Some(open) => {
                        if let Some(unclosed) = nested.pop() {
                            record(
                                ParseError::new(ParseErrorKind::MissingEnd, line_num)
                                    .with_context(unclosed),
                            );
                            nested.clear();
                        }
                        resource.components.push(open);
                        seen_event = true;
                    }
                    None => record(
                        ParseError::new(ParseErrorKind::UnexpectedEnd, line_num)
                            .with_context("END:VEVENT"),
                    ),
                }
                continue;
            }
            if let Some(open) = current.as_mut() {
                match nested.pop() {
                    Some(expected) if expected.eq_ignore_ascii_case(name) => {}
                    Some(expected) => record(
                        ParseError::new(ParseErrorKind::MismatchedComponent, line_num)
                            .with_context(format!("expected END:{expected}, found END:{name}")),
                    ),
                    None => record(
                        ParseError::new(ParseErrorKind::UnexpectedEnd, line_num)
                            .with_context(format!("END:{name}")),
                    ),
                }
                open.lines.push(line);
                continue;
            }
        }

        match current.as_mut() {
            Some(open) => open.lines.push(line),
            None if seen_event => between.push(line),
            None => resource.header.push(line),
        }
    }

    if let Some(open) = current.take() {
        record(ParseError::new(ParseErrorKind::MissingEnd, last_line).with_context("VEVENT"));
        resource.components.push(open);
    }
    resource.footer = between;

    SplitResult { resource, error }
}

/// ## Summary
/// Parses one calendar resource, rejecting unbalanced component boundaries.
///
/// ## Errors
/// Returns a parse error if BEGIN/END lines do not match.
pub fn parse(text: &str) -> RfcResult<ParsedResource> {
    split_components(text).into_result()
}

/// ## Summary
/// Splits a multi-event calendar file into one resource per UID.
///
/// Components sharing a UID (a master and its overrides) stay together, in
/// file order. Each component without a UID becomes its own resource under a
/// freshly generated UID. Every resource gets the file's header and footer.
///
/// ## Errors
/// Returns a parse error if BEGIN/END lines do not match.
pub fn split_calendar_by_uid(text: &str) -> RfcResult<Vec<ParsedResource>> {
    let parsed = parse(text)?;
    let mut groups: Vec<(String, Vec<EventComponent>)> = Vec::new();

    for component in parsed.components.iter().cloned() {
        let component = match component.uid().filter(|u| !u.is_empty()) {
            Some(_) => component,
            None => {
                let uid = uuid::Uuid::new_v4().to_string();
                tracing::debug!(%uid, "Assigning generated UID to imported component");
                let mut lines = component.lines;
                lines.insert(0, format!("UID:{uid}"));
                EventComponent::new(lines)
            }
        };
        let uid = component.uid().unwrap_or_default();

        match groups.iter_mut().find(|(existing, _)| *existing == uid) {
            Some((_, members)) => members.push(component),
            None => groups.push((uid, vec![component])),
        }
    }

    Ok(groups
        .into_iter()
        .map(|(_, components)| parsed.with_components(components))
        .collect())
}

#[cfg(test)]
#[path = "split_tests.rs"]
mod tests;
