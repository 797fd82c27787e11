use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::RecurrenceId;

/// One occurrence of a series, as addressed by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceTarget {
    pub recurrence_id: RecurrenceId,
    pub all_day: bool,
}

impl OccurrenceTarget {
    #[must_use]
    pub fn new(recurrence_id: RecurrenceId, all_day: bool) -> Self {
        Self {
            recurrence_id,
            all_day,
        }
    }

    /// Parses a `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM` recurrence id.
    ///
    /// ## Errors
    /// Returns a validation error for any other shape.
    pub fn parse(recurrence_id: &str, all_day: bool) -> RfcResult<Self> {
        Ok(Self::new(RecurrenceId::parse(recurrence_id)?, all_day))
    }
}

/// What an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    WholeSeries,
    SingleOccurrence(OccurrenceTarget),
}

impl EditScope {
    /// ## Summary
    /// Converts request input into an edit scope.
    ///
    /// `"occurrence"` (any case) selects a single occurrence and requires a
    /// recurrence id. Every other scope string means the whole series.
    ///
    /// ## Errors
    /// Returns a validation error if the occurrence scope has a missing or
    /// malformed recurrence id.
    pub fn parse(scope: &str, recurrence_id: Option<&str>, all_day: bool) -> RfcResult<Self> {
        if !scope.trim().eq_ignore_ascii_case("occurrence") {
            return Ok(Self::WholeSeries);
        }

        let recurrence_id = recurrence_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RfcError::validation("occurrence edit requires a recurrence id"))?;

        Ok(Self::SingleOccurrence(OccurrenceTarget::parse(
            recurrence_id,
            all_day,
        )?))
    }
}
