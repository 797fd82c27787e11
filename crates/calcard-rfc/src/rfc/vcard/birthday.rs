//! BDAY values, full or year-less.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Birth years at or before this are treated as unknown. Several clients
/// store year-less birthdays with a placeholder year such as 1604 or 1900.
const UNKNOWN_YEAR_CUTOFF: i32 = 1900;

/// A contact's birthday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Birthday {
    Full { date: NaiveDate },
    /// `--MM-DD`
    YearLess { month: u32, day: u32 },
}

impl Birthday {
    /// ## Summary
    /// Parses a BDAY value.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYYMMDD`, `--MM-DD` and `--MMDD`. A trailing
    /// time part (`T...`) is ignored. Returns `None` for anything else.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let date_part = value.split(['T', 't']).next().unwrap_or(value);

        if let Some(rest) = date_part.strip_prefix("--") {
            let digits: String = rest.chars().filter(|c| *c != '-').collect();
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let month: u32 = digits[..2].parse().ok()?;
            let day: u32 = digits[2..].parse().ok()?;
            // 2000 is a leap year, so --02-29 is accepted.
            NaiveDate::from_ymd_opt(2000, month, day)?;
            return Some(Self::YearLess { month, day });
        }

        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .or_else(|_err| NaiveDate::parse_from_str(date_part, "%Y%m%d"))
            .ok()
            .map(|date| Self::Full { date })
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        match self {
            Self::Full { date } => date.month(),
            Self::YearLess { month, .. } => *month,
        }
    }

    #[must_use]
    pub fn day(&self) -> u32 {
        match self {
            Self::Full { date } => date.day(),
            Self::YearLess { day, .. } => *day,
        }
    }

    /// The birth year, if known and after the placeholder cutoff.
    #[must_use]
    pub fn known_year(&self) -> Option<i32> {
        match self {
            Self::Full { date } if date.year() > UNKNOWN_YEAR_CUTOFF => Some(date.year()),
            _ => None,
        }
    }

    /// Age in whole years on `today`, or `None` when the year is unknown or
    /// `today` precedes the birthday.
    #[must_use]
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let year = self.known_year()?;
        let mut age = today.year() - year;
        if (today.month(), today.day()) < (self.month(), self.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

impl fmt::Display for Birthday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full { date } => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::YearLess { month, day } => write!(f, "--{month:02}-{day:02}"),
        }
    }
}
