//! CalDAV REPORT service layer.

//! Time-range filtering and occurrence listing for calendar views and
//! calendar-query reports.

use calcard_core::config::Settings;
use calcard_core::types::ResourceType;
use calcard_db::ledger::VersionLedger;
use calcard_db::model::{CalendarResource, ResourceRow};
use calcard_db::store::Store;
use calcard_rfc::rfc::ical::core::{EventComponent, ParsedResource};
use calcard_rfc::rfc::ical::parse::parse;
use calcard_rfc::rfc::ical::recurrence::{Occurrence, expand_occurrences, overlaps};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// One visible occurrence together with the resource it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarOccurrence {
    pub uid: String,
    pub resource_name: String,
    pub etag: String,
    #[serde(flatten)]
    pub occurrence: Occurrence,
}

/// Parses the stored calendar rows of a collection, skipping rows that no
/// longer parse.
fn parsed_calendar_rows(rows: Vec<ResourceRow>) -> Vec<(ResourceRow, ParsedResource)> {
    rows.into_iter()
        .filter(|row| row.resource_type == ResourceType::Calendar)
        .filter_map(|row| match parse(&row.content) {
            Ok(resource) => Some((row, resource)),
            Err(error) => {
                tracing::warn!(uid = %row.uid, %error, "Skipping unparseable calendar object");
                None
            }
        })
        .collect()
}

/// Whether an override starts inside the window on its own.
fn override_in_window(
    component: &EventComponent,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    component
        .time_property("DTSTART")
        .ok()
        .flatten()
        .and_then(|start| start.to_utc())
        .is_some_and(|start| window_start <= start && start < window_end)
}

fn check_window(window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> ServiceResult<()> {
    if window_end < window_start {
        return Err(ServiceError::ValidationError(
            "time range ends before it starts".to_string(),
        ));
    }
    Ok(())
}

/// ## Summary
/// Lists the calendar objects that can intersect `[window_start, window_end)`.
///
/// A series matches by the coarse recurrence bound, or when one of its
/// overrides was moved into the window.
///
/// ## Errors
/// Returns a validation error for an inverted window and storage errors
/// from the ledger.
#[tracing::instrument(skip(ledger))]
pub async fn resources_in_range<S: Store>(
    ledger: &VersionLedger<S>,
    collection_id: Uuid,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> ServiceResult<Vec<CalendarResource>> {
    check_window(window_start, window_end)?;

    let rows = ledger.load_resources(collection_id).await?;
    let matching: Vec<CalendarResource> = parsed_calendar_rows(rows)
        .into_iter()
        .filter(|(_, resource)| {
            overlaps(resource, window_start, window_end)
                || resource
                    .overrides()
                    .any(|c| override_in_window(c, window_start, window_end))
        })
        .filter_map(|(row, _)| row.as_calendar())
        .collect();

    tracing::debug!(count = matching.len(), "Calendar objects in range");
    Ok(matching)
}

/// ## Summary
/// Expands every calendar object of a collection into the occurrences
/// visible in `[window_start, window_end)`, earliest first.
///
/// Each series is capped at `calendar.max_expanded_occurrences`. An object
/// whose expansion fails is logged and left out.
///
/// ## Errors
/// Returns a validation error for an inverted window and storage errors
/// from the ledger.
#[tracing::instrument(skip(ledger, settings))]
pub async fn occurrences_in_range<S: Store>(
    ledger: &VersionLedger<S>,
    settings: &Settings,
    collection_id: Uuid,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> ServiceResult<Vec<CalendarOccurrence>> {
    check_window(window_start, window_end)?;
    let cap = settings.calendar.max_expanded_occurrences;

    let rows = ledger.load_resources(collection_id).await?;
    let mut occurrences = Vec::new();
    for (row, resource) in parsed_calendar_rows(rows) {
        let expanded = match expand_occurrences(&resource, window_start, window_end, cap) {
            Ok(expanded) => expanded,
            Err(error) => {
                tracing::warn!(uid = %row.uid, %error, "Skipping calendar object that failed to expand");
                continue;
            }
        };
        occurrences.extend(expanded.into_iter().map(|occurrence| CalendarOccurrence {
            uid: row.uid.clone(),
            resource_name: row.resource_name.clone(),
            etag: row.etag.clone(),
            occurrence,
        }));
    }

    occurrences.sort_by(|a, b| {
        a.occurrence
            .start
            .cmp(&b.occurrence.start)
            .then_with(|| a.uid.cmp(&b.uid))
    });
    Ok(occurrences)
}

#[cfg(test)]
mod tests {
    use calcard_db::ledger::Precondition;
    use calcard_db::store::MemoryStore;
    use calcard_rfc::rfc::ical::build::EventFields;
    use calcard_rfc::rfc::ical::core::{EventTime, Frequency, Rule};
    use calcard_rfc::rfc::ical::series::EditScope;
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::caldav::object::{PutEventContext, put_event};

    fn utc(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, hour, 0, 0).unwrap()
    }

    async fn seeded() -> (VersionLedger<MemoryStore>, Uuid) {
        let ledger = VersionLedger::new(MemoryStore::new());
        let settings = Settings::default();
        let cal = Uuid::new_v4();
        let ctx = PutEventContext {
            collection_id: cal,
            scope: EditScope::WholeSeries,
            precondition: Precondition::None,
        };

        let weekly = EventFields::new("weekly", EventTime::utc(utc(1, 6, 10).naive_utc()))
            .with_end(EventTime::utc(utc(1, 6, 11).naive_utc()))
            .with_summary("Standup")
            .with_rule(Rule::new(Frequency::Weekly).with_count(5));
        put_event(&ledger, &settings, &ctx, &weekly).await.unwrap();

        let single = EventFields::new(
            "dentist",
            EventTime::date(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()),
        )
        .with_summary("Dentist");
        put_event(&ledger, &settings, &ctx, &single).await.unwrap();

        let moved = EventFields::new("weekly", EventTime::utc(utc(4, 1, 9).naive_utc()))
            .with_summary("Moved far away");
        let occurrence = PutEventContext {
            scope: EditScope::parse("occurrence", Some("2025-01-13"), false).unwrap(),
            ..ctx
        };
        put_event(&ledger, &settings, &occurrence, &moved)
            .await
            .unwrap();

        (ledger, cal)
    }

    #[test_log::test(tokio::test)]
    async fn range_filter_uses_series_bound_and_overrides() {
        let (ledger, cal) = seeded().await;

        let january = resources_in_range(&ledger, cal, utc(1, 1, 0), utc(2, 1, 0))
            .await
            .unwrap();
        let uids: Vec<&str> = january.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, vec!["weekly"]);

        let march = resources_in_range(&ledger, cal, utc(3, 1, 0), utc(3, 31, 0))
            .await
            .unwrap();
        let mut uids: Vec<&str> = march.iter().map(|r| r.uid.as_str()).collect();
        uids.sort_unstable();
        // COUNT is not evaluated by the coarse bound, so the series still matches.
        assert_eq!(uids, vec!["dentist", "weekly"]);

        let before = resources_in_range(&ledger, cal, utc(1, 1, 0), utc(1, 5, 0))
            .await
            .unwrap();
        assert!(before.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn occurrences_are_expanded_and_sorted() {
        let (ledger, cal) = seeded().await;

        let listed = occurrences_in_range(
            &ledger,
            &Settings::default(),
            cal,
            utc(1, 1, 0),
            utc(5, 1, 0),
        )
        .await
        .unwrap();

        let summaries: Vec<_> = listed
            .iter()
            .map(|o| o.occurrence.summary.clone().unwrap_or_default())
            .collect();
        assert_eq!(
            summaries,
            vec![
                "Standup",
                "Standup",
                "Standup",
                "Standup",
                "Dentist",
                "Moved far away"
            ]
        );
        assert!(listed.iter().all(|o| !o.etag.is_empty()));
        assert!(listed[5].occurrence.overridden);
    }

    #[test_log::test(tokio::test)]
    async fn cap_limits_each_series() {
        let (ledger, cal) = seeded().await;
        let mut settings = Settings::default();
        settings.calendar.max_expanded_occurrences = 2;

        let listed = occurrences_in_range(&ledger, &settings, cal, utc(1, 1, 0), utc(1, 31, 0))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn inverted_window_is_rejected() {
        let (ledger, cal) = seeded().await;
        let err = resources_in_range(&ledger, cal, utc(2, 1, 0), utc(1, 1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
