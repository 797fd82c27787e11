//! Date and date-time values for DTSTART, DTEND, RECURRENCE-ID and EXDATE.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;

use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::parse::{ContentLine, ParseError, ParseErrorKind};

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A point in time as written in an event property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum EventTime {
    /// All-day value (`VALUE=DATE`).
    Date { date: NaiveDate },
    /// UTC date-time (trailing `Z`).
    Utc { datetime: NaiveDateTime },
    /// Local date-time qualified by an IANA `TZID`.
    Zoned { datetime: NaiveDateTime, tzid: String },
    /// Local date-time with no zone.
    Floating { datetime: NaiveDateTime },
}

impl EventTime {
    #[must_use]
    pub fn date(date: NaiveDate) -> Self {
        Self::Date { date }
    }

    #[must_use]
    pub fn utc(datetime: NaiveDateTime) -> Self {
        Self::Utc { datetime }
    }

    /// Creates a TZID-qualified value.
    ///
    /// ## Errors
    /// Returns a validation error if `tzid` is not a known IANA zone.
    pub fn zoned(datetime: NaiveDateTime, tzid: impl Into<String>) -> RfcResult<Self> {
        let tzid = tzid.into();
        resolve_tz(&tzid)?;
        Ok(Self::Zoned { datetime, tzid })
    }

    #[must_use]
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date { .. })
    }

    /// The TZID, if this value is zone-qualified.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// Calendar date of this value in its own frame.
    #[must_use]
    pub fn naive_date(&self) -> NaiveDate {
        match self {
            Self::Date { date } => *date,
            Self::Utc { datetime } | Self::Zoned { datetime, .. } | Self::Floating { datetime } => {
                datetime.date()
            }
        }
    }

    /// The value part as written after the colon.
    #[must_use]
    pub fn value_string(&self) -> String {
        match self {
            Self::Date { date } => date.format(DATE_FORMAT).to_string(),
            Self::Utc { datetime } => format!("{}Z", datetime.format(DATE_TIME_FORMAT)),
            Self::Zoned { datetime, .. } | Self::Floating { datetime } => {
                datetime.format(DATE_TIME_FORMAT).to_string()
            }
        }
    }

    /// Renders a full content line such as `DTSTART;VALUE=DATE:20250106`.
    #[must_use]
    pub fn to_property(&self, name: &str) -> String {
        match self {
            Self::Date { .. } => format!("{name};VALUE=DATE:{}", self.value_string()),
            Self::Zoned { tzid, .. } => format!("{name};TZID={tzid}:{}", self.value_string()),
            Self::Utc { .. } | Self::Floating { .. } => format!("{name}:{}", self.value_string()),
        }
    }

    /// Parses a DTSTART-like property.
    ///
    /// ## Errors
    /// Returns a parse error for malformed values and a validation error
    /// for an unknown TZID.
    pub fn from_content_line(line: &ContentLine, line_num: usize) -> RfcResult<Self> {
        let first = line.value.split(',').next().unwrap_or_default();
        Self::parse_value(first, line.param("VALUE"), line.param("TZID"), line_num)
    }

    /// Parses every value of a possibly comma-separated property (EXDATE, RDATE).
    ///
    /// ## Errors
    /// Fails on the first malformed value.
    pub fn list_from_content_line(line: &ContentLine, line_num: usize) -> RfcResult<Vec<Self>> {
        line.value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self::parse_value(v, line.param("VALUE"), line.param("TZID"), line_num))
            .collect()
    }

    fn parse_value(
        value: &str,
        value_type: Option<&str>,
        tzid: Option<&str>,
        line_num: usize,
    ) -> RfcResult<Self> {
        let invalid = || {
            RfcError::Parse(
                ParseError::new(ParseErrorKind::InvalidDateTime, line_num)
                    .with_context(value.to_string()),
            )
        };

        let is_date = value_type.is_some_and(|v| v.eq_ignore_ascii_case("DATE")) || value.len() == 8;
        if is_date {
            let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_err| invalid())?;
            return Ok(Self::Date { date });
        }

        if let Some(utc) = value.strip_suffix(['Z', 'z']) {
            let datetime =
                NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT).map_err(|_err| invalid())?;
            return Ok(Self::Utc { datetime });
        }

        let datetime =
            NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).map_err(|_err| invalid())?;
        match tzid {
            Some(tzid) => Self::zoned(datetime, tzid),
            None => Ok(Self::Floating { datetime }),
        }
    }

    /// Converts to an instant.
    ///
    /// All-day and floating values are read as UTC. Local times that fall in
    /// a DST gap resolve to the instant one hour later.
    #[must_use]
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date { date } => Some(date.and_time(NaiveTime::MIN).and_utc()),
            Self::Utc { datetime } | Self::Floating { datetime } => Some(datetime.and_utc()),
            Self::Zoned { datetime, tzid } => {
                let tz = resolve_tz(tzid).ok()?;
                tz.from_local_datetime(datetime)
                    .earliest()
                    .or_else(|| {
                        tz.from_local_datetime(&(*datetime + TimeDelta::hours(1)))
                            .earliest()
                    })
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoned { tzid, .. } => write!(f, "{} ({tzid})", self.value_string()),
            _ => f.write_str(&self.value_string()),
        }
    }
}

/// Looks up an IANA time zone by name.
///
/// ## Errors
/// Returns a validation error for unknown zones.
pub fn resolve_tz(tzid: &str) -> RfcResult<chrono_tz::Tz> {
    tzid.parse::<chrono_tz::Tz>()
        .map_err(|_err| RfcError::validation(format!("unknown TZID '{tzid}'")))
}

/// Identifies one occurrence of a series in request input.
///
/// Only `YYYY-MM-DD` and `YYYY-MM-DDTHH:MM` are accepted, so a value of this
/// type is always well formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceId {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl RecurrenceId {
    /// Parses `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM`.
    ///
    /// ## Errors
    /// Returns a validation error for any other shape or an impossible date.
    pub fn parse(input: &str) -> RfcResult<Self> {
        let invalid = || {
            RfcError::validation(format!(
                "recurrence id '{input}' is neither YYYY-MM-DD nor YYYY-MM-DDTHH:MM"
            ))
        };

        let shape_ok = |pattern: &str| {
            input.len() == pattern.len()
                && input.bytes().zip(pattern.bytes()).all(|(c, p)| match p {
                    b'9' => c.is_ascii_digit(),
                    _ => c == p,
                })
        };

        if shape_ok("9999-99-99") {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .map(Self::Date)
                .map_err(|_err| invalid())
        } else if shape_ok("9999-99-99T99:99") {
            NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
                .map(Self::DateTime)
                .map_err(|_err| invalid())
        } else {
            Err(invalid())
        }
    }

    /// Formats this id with the same rules as DTSTART: a date for all-day
    /// series, a TZID-qualified local time when the series is zoned, UTC otherwise.
    ///
    /// ## Errors
    /// Returns a validation error for an unknown TZID.
    pub fn to_event_time(self, all_day: bool, tzid: Option<&str>) -> RfcResult<EventTime> {
        let datetime = match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN),
            Self::DateTime(datetime) => datetime,
        };

        if all_day {
            return Ok(EventTime::date(datetime.date()));
        }

        match tzid {
            Some(tzid) => EventTime::zoned(datetime, tzid),
            None => Ok(EventTime::utc(datetime)),
        }
    }
}

impl fmt::Display for RecurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%dT%H:%M")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> ContentLine {
        ContentLine::parse(text, 1).unwrap()
    }

    #[test]
    fn parse_forms() {
        assert_eq!(
            EventTime::from_content_line(&line("DTSTART;VALUE=DATE:20250106"), 1).unwrap(),
            EventTime::date(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
        );
        assert!(matches!(
            EventTime::from_content_line(&line("DTSTART:20250106T100000Z"), 1).unwrap(),
            EventTime::Utc { .. }
        ));
        assert!(matches!(
            EventTime::from_content_line(&line("DTSTART:20250106T100000"), 1).unwrap(),
            EventTime::Floating { .. }
        ));
        let zoned =
            EventTime::from_content_line(&line("DTSTART;TZID=Europe/Berlin:20250106T100000"), 1)
                .unwrap();
        assert_eq!(zoned.tzid(), Some("Europe/Berlin"));
    }

    #[test]
    fn invalid_values() {
        assert!(matches!(
            EventTime::from_content_line(&line("DTSTART:2025-01-06"), 3),
            Err(RfcError::Parse(_))
        ));
        assert!(matches!(
            EventTime::from_content_line(&line("DTSTART;TZID=Mars/Olympus:20250106T100000"), 3),
            Err(RfcError::Validation(_))
        ));
    }

    #[test]
    fn property_rendering() {
        let date = EventTime::date(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        assert_eq!(date.to_property("DTSTART"), "DTSTART;VALUE=DATE:20250106");

        let dt = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(EventTime::utc(dt).to_property("DTEND"), "DTEND:20250106T100000Z");
        assert_eq!(
            EventTime::zoned(dt, "America/New_York")
                .unwrap()
                .to_property("DTSTART"),
            "DTSTART;TZID=America/New_York:20250106T100000"
        );
    }

    #[test]
    fn zoned_to_utc() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let zoned = EventTime::zoned(dt, "Europe/Berlin").unwrap();
        assert_eq!(
            zoned.to_utc().unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn recurrence_id_shapes() {
        assert_eq!(
            RecurrenceId::parse("2025-01-13").unwrap(),
            RecurrenceId::Date(NaiveDate::from_ymd_opt(2025, 1, 13).unwrap())
        );
        assert!(matches!(
            RecurrenceId::parse("2025-01-13T09:30").unwrap(),
            RecurrenceId::DateTime(_)
        ));
        for bad in ["", "2025-1-13", "20250113", "2025-01-13T9:30", "2025-02-30", "2025-01-13T09:30:00"] {
            assert!(
                matches!(RecurrenceId::parse(bad), Err(RfcError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn recurrence_id_formatting() {
        let id = RecurrenceId::parse("2025-01-13T09:30").unwrap();
        assert_eq!(
            id.to_event_time(false, None).unwrap().value_string(),
            "20250113T093000Z"
        );
        assert_eq!(
            id.to_event_time(true, None).unwrap().to_property("RECURRENCE-ID"),
            "RECURRENCE-ID;VALUE=DATE:20250113"
        );
        assert_eq!(
            id.to_event_time(false, Some("Europe/Paris"))
                .unwrap()
                .to_property("RECURRENCE-ID"),
            "RECURRENCE-ID;TZID=Europe/Paris:20250113T093000"
        );
    }
}
