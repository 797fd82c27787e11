use serde::Serialize;

use super::Birthday;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::parse::{ContentLine, unescape_text};

/// One VCARD, held as its unfolded content lines without the surrounding
/// `BEGIN:VCARD` / `END:VCARD`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VCard {
    pub lines: Vec<String>,
}

/// Display fields cached alongside a stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ContactDisplay {
    pub display_name: Option<String>,
    pub primary_email: Option<String>,
    pub birthday: Option<Birthday>,
}

/// Drops a `group.` prefix from the property name (`item1.EMAIL:...`).
fn strip_group(line: &str) -> &str {
    let name_end = line.find([';', ':']).unwrap_or(line.len());
    match line[..name_end].rfind('.') {
        Some(dot) => &line[dot + 1..],
        None => line,
    }
}

/// Splits a structured value on unescaped `;` and resolves escapes in each part.
fn structured_parts(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => parts.push(unescape_text(&std::mem::take(&mut current))),
            _ => current.push(c),
        }
    }
    parts.push(unescape_text(&current));
    parts
}

impl VCard {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Iterates over the card's properties with any group prefix removed.
    /// Lines that do not parse are skipped.
    pub fn properties(&self) -> impl Iterator<Item = ContentLine> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| ContentLine::parse(strip_group(line), i + 1).ok())
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<ContentLine> {
        self.properties().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn uid(&self) -> Option<String> {
        self.property("UID")
            .map(|p| p.value.trim().to_string())
            .filter(|u| !u.is_empty())
    }

    /// Returns a copy carrying `uid`, replacing any existing UID line.
    #[must_use]
    pub fn with_uid(&self, uid: &str) -> Self {
        let mut lines: Vec<String> = self
            .lines
            .iter()
            .filter(|l| {
                !ContentLine::parse(strip_group(l), 0)
                    .is_ok_and(|p| p.name.eq_ignore_ascii_case("UID"))
            })
            .cloned()
            .collect();
        let after_version = lines
            .iter()
            .position(|l| l.get(..8).is_some_and(|p| p.eq_ignore_ascii_case("VERSION:")))
            .map_or(0, |i| i + 1);
        lines.insert(after_version, format!("UID:{uid}"));
        Self { lines }
    }

    /// ## Summary
    /// Checks that the card names its subject.
    ///
    /// ## Errors
    /// Returns a validation error if neither FN nor N carries a value.
    pub fn validate(&self) -> RfcResult<()> {
        if self.display_name().is_none() {
            return Err(RfcError::validation("VCARD has neither FN nor N"));
        }
        Ok(())
    }

    /// FN, falling back to N assembled as `prefix given additional family suffix`.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(formatted) = self
            .property("FN")
            .map(|p| p.text().trim().to_string())
            .filter(|n| !n.is_empty())
        {
            return Some(formatted);
        }

        let n = self.property("N")?;
        let parts = structured_parts(&n.value);
        let part = |i: usize| parts.get(i).map_or("", |s| s.trim());
        let name = [part(3), part(1), part(2), part(0), part(4)]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }

    /// The first EMAIL marked preferred, else the first EMAIL.
    #[must_use]
    pub fn primary_email(&self) -> Option<String> {
        let emails: Vec<ContentLine> = self
            .properties()
            .filter(|p| p.name == "EMAIL" && !p.value.trim().is_empty())
            .collect();
        emails
            .iter()
            .find(|p| p.has_param_value("TYPE", "PREF") || p.param("PREF").is_some())
            .or_else(|| emails.first())
            .map(|p| p.text().trim().to_string())
    }

    /// BDAY, when it parses.
    #[must_use]
    pub fn birthday(&self) -> Option<Birthday> {
        self.property("BDAY").and_then(|p| Birthday::parse(&p.value))
    }

    #[must_use]
    pub fn display(&self) -> ContactDisplay {
        ContactDisplay {
            display_name: self.display_name(),
            primary_email: self.primary_email(),
            birthday: self.birthday(),
        }
    }
}
