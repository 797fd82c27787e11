//! Recurrence rule value (RFC 5545 §3.3.10).
//!
//! Only the rule parts the editor writes and the evaluator reads are modelled:
//! FREQ, INTERVAL, COUNT, UNTIL, BYDAY, BYMONTH and BYMONTHDAY. Other parts
//! are ignored on parse.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::rfc::ical::parse::{ParseError, ParseErrorKind, ParseResult};

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a two-letter abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BYDAY entry: a weekday with an optional ordinal (`MO`, `1MO`, `-1FR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// Occurrence number within the period (-53..=53, never 0).
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let split = s.len().checked_sub(2)?;
        let (ordinal, day) = s.split_at_checked(split)?;
        let weekday = Weekday::parse(day)?;
        if ordinal.is_empty() {
            return Some(Self::every(weekday));
        }
        let n: i8 = ordinal.trim_start_matches('+').parse().ok()?;
        (n != 0 && (-53..=53).contains(&n)).then_some(Self {
            ordinal: Some(n),
            weekday,
        })
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// UNTIL bound, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleUntil {
    Date(NaiveDate),
    /// UTC date-time, written with a trailing `Z`.
    DateTime(NaiveDateTime),
    /// Date-time without `Z`. Written back as it came, compared as UTC like
    /// a floating DTSTART.
    Floating(NaiveDateTime),
}

impl RuleUntil {
    /// The last instant covered by this bound. A date covers its whole day.
    #[must_use]
    pub fn last_instant(self) -> chrono::DateTime<chrono::Utc> {
        match self {
            Self::Date(date) => date
                .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
                .and_utc(),
            Self::DateTime(datetime) | Self::Floating(datetime) => datetime.and_utc(),
        }
    }
}

impl fmt::Display for RuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y%m%d")),
            Self::DateTime(dt) => write!(f, "{}Z", dt.format("%Y%m%dT%H%M%S")),
            Self::Floating(dt) => write!(f, "{}", dt.format("%Y%m%dT%H%M%S")),
        }
    }
}

/// Recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub freq: Frequency,
    /// Repeat interval, 1 when absent.
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<RuleUntil>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month: Vec<u8>,
    pub by_month_day: Vec<i8>,
}

impl Rule {
    #[must_use]
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month: Vec::new(),
            by_month_day: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: RuleUntil) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn with_by_day(mut self, days: Vec<WeekdayNum>) -> Self {
        self.by_day = days;
        self
    }

    #[must_use]
    pub fn with_by_month(mut self, months: Vec<u8>) -> Self {
        self.by_month = months;
        self
    }

    #[must_use]
    pub fn with_by_month_day(mut self, days: Vec<i8>) -> Self {
        self.by_month_day = days;
        self
    }

    /// Parses an RRULE value such as `FREQ=WEEKLY;COUNT=5;BYDAY=MO,WE`.
    ///
    /// Both COUNT and UNTIL are kept when a client sends both; rendering
    /// writes COUNT only.
    ///
    /// ## Errors
    /// Returns an error if FREQ is missing or any modelled part is malformed.
    pub fn parse(text: &str, line_num: usize) -> ParseResult<Self> {
        let invalid = |context: &str| {
            ParseError::new(ParseErrorKind::InvalidRRule, line_num).with_context(context.to_string())
        };

        let mut freq = None;
        let mut rule = Self::new(Frequency::Daily);

        for part in text.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| invalid(part))?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => freq = Some(Frequency::parse(value).ok_or_else(|| invalid(part))?),
                "INTERVAL" => {
                    let interval: u32 = value.parse().map_err(|_err| invalid(part))?;
                    if interval == 0 {
                        return Err(invalid(part));
                    }
                    rule.interval = interval;
                }
                "COUNT" => rule.count = Some(value.parse().map_err(|_err| invalid(part))?),
                "UNTIL" => rule.until = Some(parse_until(value).ok_or_else(|| invalid(part))?),
                "BYDAY" => {
                    rule.by_day = value
                        .split(',')
                        .map(|d| WeekdayNum::parse(d.trim()))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| invalid(part))?;
                }
                "BYMONTH" => {
                    rule.by_month = parse_list(value, |m: &u8| (1..=12).contains(m))
                        .ok_or_else(|| invalid(part))?;
                }
                "BYMONTHDAY" => {
                    rule.by_month_day =
                        parse_list(value, |d: &i8| *d != 0 && (-31..=31).contains(d))
                            .ok_or_else(|| invalid(part))?;
                }
                other => tracing::trace!(part = %other, "Ignoring unsupported RRULE part"),
            }
        }

        rule.freq = freq.ok_or_else(|| invalid("missing FREQ"))?;
        Ok(rule)
    }
}

fn parse_until(value: &str) -> Option<RuleUntil> {
    if value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(RuleUntil::Date);
    }
    match value.strip_suffix(['Z', 'z']) {
        Some(utc) => NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(RuleUntil::DateTime),
        None => NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
            .ok()
            .map(RuleUntil::Floating),
    }
}

fn parse_list<T: std::str::FromStr>(value: &str, valid: impl Fn(&T) -> bool) -> Option<Vec<T>> {
    value
        .split(',')
        .map(|v| v.trim().parse::<T>().ok().filter(|n| valid(n)))
        .collect()
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.freq)?;

        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }

        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        } else if let Some(until) = self.until {
            write!(f, ";UNTIL={until}")?;
        }

        if !self.by_day.is_empty() {
            write!(f, ";BYDAY={}", join(&self.by_day))?;
        }
        if !self.by_month.is_empty() {
            write!(f, ";BYMONTH={}", join(&self.by_month))?;
        }
        if !self.by_month_day.is_empty() {
            write!(f, ";BYMONTHDAY={}", join(&self.by_month_day))?;
        }

        Ok(())
    }
}
