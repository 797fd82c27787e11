//! Recurring series scenarios: exceptions, overrides and versioning.

use calcard_core::types::ResourceType;
use calcard_db::ledger::{ModifyOutcome, Precondition};
use calcard_rfc::rfc::ical::core::EventTime;
use calcard_rfc::rfc::ical::series::{EditScope, OccurrenceTarget};
use calcard_service::caldav::object::{exclude_occurrence, put_event};
use calcard_service::caldav::report::occurrences_in_range;
use uuid::Uuid;

use super::helpers::*;

// ============================================================================
// Exceptions
// ============================================================================

/// ## Summary
/// Excluding 2025-01-20 from a five-week series adds a matching EXDATE to the
/// master, bumps the ctag once, changes the `ETag` and leaves four occurrences.
#[test_log::test(tokio::test)]
async fn exclude_occurrence_adds_exdate() {
    let env = TestEnv::new();
    let cal = Uuid::new_v4();
    let created = put_event(
        &env.ledger,
        &env.settings,
        &scoped(cal, EditScope::WholeSeries),
        &weekly_series(),
    )
    .await
    .expect("series should be created");
    assert_eq!(created.ctag, 1);

    let target = OccurrenceTarget::parse("2025-01-20", false).expect("valid id");
    let outcome = exclude_occurrence(&env.ledger, cal, "evt1", &target, Precondition::None)
        .await
        .expect("exclusion should succeed");
    let ModifyOutcome::Written(written) = outcome else {
        panic!("series should be rewritten, not deleted");
    };
    assert_eq!(written.ctag, 2);
    assert_ne!(written.etag, created.etag);
    assert_eq!(written.etag, env.etag(cal, ResourceType::Calendar, "evt1").await);

    let resource = env.calendar(cal, "evt1").await;
    let master = resource.master().expect("master should remain");
    let exdates: Vec<String> = master
        .time_list("EXDATE")
        .expect("EXDATE should parse")
        .iter()
        .map(EventTime::value_string)
        .collect();
    assert_eq!(exdates, vec!["20250120T100000Z"]);
    assert_eq!(
        master.property("RRULE").map(|p| p.value),
        Some("FREQ=WEEKLY;COUNT=5".to_string())
    );

    let occurrences =
        occurrences_in_range(&env.ledger, &env.settings, cal, utc(1, 1), utc(3, 1))
            .await
            .expect("expansion should succeed");
    let starts: Vec<_> = occurrences
        .iter()
        .map(|o| o.occurrence.start.naive_utc())
        .collect();
    assert_eq!(starts.len(), 4);
    assert!(!starts.contains(&jan(20, 10)));
    assert_eq!(starts[..3], [jan(6, 10), jan(13, 10), jan(27, 10)]);
}

/// ## Summary
/// Excluding the same occurrence twice leaves a single EXDATE value.
#[test_log::test(tokio::test)]
async fn repeated_exclusion_is_idempotent() {
    let env = TestEnv::new();
    let cal = Uuid::new_v4();
    put_event(
        &env.ledger,
        &env.settings,
        &scoped(cal, EditScope::WholeSeries),
        &weekly_series(),
    )
    .await
    .expect("series should be created");

    let target = OccurrenceTarget::parse("2025-01-20", false).expect("valid id");
    for _ in 0..2 {
        exclude_occurrence(&env.ledger, cal, "evt1", &target, Precondition::None)
            .await
            .expect("exclusion should succeed");
    }

    let resource = env.calendar(cal, "evt1").await;
    let master = resource.master().expect("master should remain");
    assert_eq!(master.time_list("EXDATE").expect("EXDATE should parse").len(), 1);
}

// ============================================================================
// Overrides
// ============================================================================

/// ## Summary
/// Rescheduling 2025-01-13 appends one override carrying that RECURRENCE-ID;
/// a second edit of the same occurrence replaces it instead of adding another.
#[test_log::test(tokio::test)]
async fn occurrence_override_is_upserted() {
    let env = TestEnv::new();
    let cal = Uuid::new_v4();
    put_event(
        &env.ledger,
        &env.settings,
        &scoped(cal, EditScope::WholeSeries),
        &weekly_series(),
    )
    .await
    .expect("series should be created");

    let occurrence = EditScope::parse("occurrence", Some("2025-01-13"), false).expect("valid scope");
    for title in ["Rescheduled", "Rescheduled again"] {
        let edit = weekly_series().with_summary(title);
        put_event(&env.ledger, &env.settings, &scoped(cal, occurrence), &edit)
            .await
            .expect("override should be stored");
    }

    let resource = env.calendar(cal, "evt1").await;
    assert_eq!(resource.components.len(), 2);

    let master = resource.master().expect("master should remain");
    assert_eq!(
        master.property("RRULE").map(|p| p.value),
        Some("FREQ=WEEKLY;COUNT=5".to_string())
    );
    assert_eq!(
        master.property("SUMMARY").map(|p| p.text()).as_deref(),
        Some("Weekly sync")
    );

    let overrides: Vec<_> = resource.overrides().collect();
    assert_eq!(overrides.len(), 1);
    assert_eq!(
        overrides[0].recurrence_id_value().as_deref(),
        Some("20250113T100000Z")
    );
    assert_eq!(
        overrides[0].property("SUMMARY").map(|p| p.text()).as_deref(),
        Some("Rescheduled again")
    );
    assert!(overrides[0].property("RRULE").is_none());
}

/// ## Summary
/// A malformed recurrence id is rejected before anything is written.
#[test_log::test(tokio::test)]
async fn malformed_recurrence_id_changes_nothing() {
    let env = TestEnv::new();
    let cal = Uuid::new_v4();
    put_event(
        &env.ledger,
        &env.settings,
        &scoped(cal, EditScope::WholeSeries),
        &weekly_series(),
    )
    .await
    .expect("series should be created");
    let before = env.etag(cal, ResourceType::Calendar, "evt1").await;

    assert!(EditScope::parse("occurrence", Some("13/01/2025"), false).is_err());
    assert!(EditScope::parse("occurrence", None, false).is_err());

    assert_eq!(env.etag(cal, ResourceType::Calendar, "evt1").await, before);
    assert_eq!(env.ledger.ctag(cal).await.expect("ctag"), 1);
}

// ============================================================================
// Versioning
// ============================================================================

/// ## Summary
/// Concurrent writers to one collection each get their own ctag.
#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_writes_get_distinct_ctags() {
    let env = TestEnv::new();
    let cal = Uuid::new_v4();

    let events: Vec<_> = (0..16)
        .map(|i| {
            let mut event = weekly_series();
            event.uid = format!("evt-{i}");
            event
        })
        .collect();
    let ctx = scoped(cal, EditScope::WholeSeries);

    let writes = events
        .iter()
        .map(|event| put_event(&env.ledger, &env.settings, &ctx, event));
    let mut ctags: Vec<i64> = futures::future::join_all(writes)
        .await
        .into_iter()
        .map(|r| r.expect("write should succeed").ctag)
        .collect();
    ctags.sort_unstable();

    assert_eq!(ctags, (1..=16).collect::<Vec<_>>());
    assert_eq!(env.ledger.ctag(cal).await.expect("ctag"), 16);
}
