use chrono::NaiveTime;

use super::scope::{EditScope, OccurrenceTarget};
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::build::{EventFields, build_component};
use crate::rfc::ical::core::{EventComponent, EventTime, RecurrenceId};

/// Formats `target` in the same form as `form` (a DTSTART or RECURRENCE-ID).
///
/// A date-only id against a timed form takes the form's time of day, so
/// `2025-01-20` addresses the 10:00 occurrence of a series starting at 10:00.
/// The form's value type always wins over `target.all_day`, which only
/// applies when there is no form to follow.
fn occurrence_time(target: &OccurrenceTarget, form: Option<&EventTime>) -> RfcResult<EventTime> {
    let Some(form) = form else {
        return target.recurrence_id.to_event_time(target.all_day, None);
    };

    let datetime = match target.recurrence_id {
        RecurrenceId::DateTime(datetime) => datetime,
        RecurrenceId::Date(date) => match form {
            EventTime::Date { .. } => date.and_time(NaiveTime::MIN),
            EventTime::Utc { datetime }
            | EventTime::Zoned { datetime, .. }
            | EventTime::Floating { datetime } => date.and_time(datetime.time()),
        },
    };

    if form.is_all_day() {
        return Ok(EventTime::date(datetime.date()));
    }

    match form {
        EventTime::Zoned { tzid, .. } => EventTime::zoned(datetime, tzid.clone()),
        EventTime::Floating { .. } => Ok(EventTime::Floating { datetime }),
        EventTime::Date { .. } | EventTime::Utc { .. } => Ok(EventTime::utc(datetime)),
    }
}

fn check_uid(components: &[EventComponent], uid: &str) -> RfcResult<()> {
    let uid = uid.trim();
    match components.iter().filter_map(EventComponent::uid).find(|u| u != uid) {
        Some(existing) => Err(RfcError::validation(format!(
            "edit for UID '{uid}' does not match resource UID '{existing}'"
        ))),
        None => Ok(()),
    }
}

fn master_start(components: &[EventComponent]) -> RfcResult<Option<EventTime>> {
    match components.iter().find(|c| c.is_master()) {
        Some(master) => master.time_property("DTSTART"),
        None => Ok(None),
    }
}

/// ## Summary
/// Replaces the series master with one built from `fields`.
///
/// The master keeps its position. Without a master, the new one is
/// prepended. Overrides are returned untouched.
///
/// ## Errors
/// Returns a validation error if the fields are invalid or carry a UID that
/// differs from the resource's.
pub fn replace_master(
    components: &[EventComponent],
    fields: &EventFields,
) -> RfcResult<Vec<EventComponent>> {
    check_uid(components, &fields.uid)?;

    let mut master_fields = fields.clone();
    master_fields.recurrence_id = None;
    let master = build_component(&master_fields)?;

    let mut result = components.to_vec();
    match result.iter().position(EventComponent::is_master) {
        Some(index) => result[index] = master,
        None => result.insert(0, master),
    }
    Ok(result)
}

/// ## Summary
/// Inserts or replaces the override for one occurrence.
///
/// The RECURRENCE-ID follows the master's DTSTART form, or the edit's own
/// start when there is no master. An existing override with the same value
/// is removed and the new one appended, so overrides stay in insertion order.
///
/// ## Errors
/// Returns a validation error if the fields are invalid or carry a
/// different UID.
pub fn upsert_occurrence_override(
    components: &[EventComponent],
    target: &OccurrenceTarget,
    fields: &EventFields,
) -> RfcResult<Vec<EventComponent>> {
    check_uid(components, &fields.uid)?;

    let form = master_start(components)?.unwrap_or_else(|| fields.start.clone());
    let recurrence_id = occurrence_time(target, Some(&form))?;
    let value = recurrence_id.value_string();

    let mut override_fields = fields.clone();
    override_fields.rule = None;
    override_fields.recurrence_id = Some(recurrence_id);
    let built = build_component(&override_fields)?;

    let mut result: Vec<EventComponent> = components
        .iter()
        .filter(|c| c.recurrence_id_value().as_deref() != Some(value.as_str()))
        .cloned()
        .collect();
    result.push(built);

    tracing::trace!(recurrence_id = %value, "Upserted occurrence override");
    Ok(result)
}

/// ## Summary
/// Removes one occurrence from a series.
///
/// A matching override is dropped. Otherwise an EXDATE in the master's
/// DTSTART form is added to the master, unless an equal value is already
/// listed.
///
/// ## Errors
/// Returns [`RfcError::NoMaster`] when there is neither a matching override
/// nor a master. Callers delete the whole resource in that case.
pub fn exclude_occurrence(
    components: &[EventComponent],
    target: &OccurrenceTarget,
) -> RfcResult<Vec<EventComponent>> {
    let mut matched = None;
    for (index, component) in components.iter().enumerate() {
        let Some(rid) = component.time_property("RECURRENCE-ID")? else {
            continue;
        };
        if occurrence_time(target, Some(&rid))?.value_string() == rid.value_string() {
            matched = Some(index);
            break;
        }
    }

    if let Some(index) = matched {
        let mut result = components.to_vec();
        result.remove(index);
        tracing::trace!(recurrence_id = %target.recurrence_id, "Dropped occurrence override");
        return Ok(result);
    }

    let Some(master_index) = components.iter().position(EventComponent::is_master) else {
        return Err(RfcError::NoMaster {
            uid: components
                .first()
                .and_then(EventComponent::uid)
                .unwrap_or_default(),
        });
    };
    let master = &components[master_index];

    let exdate = occurrence_time(target, master.time_property("DTSTART")?.as_ref())?;
    let value = exdate.value_string();
    if master
        .time_list("EXDATE")?
        .iter()
        .any(|existing| existing.value_string() == value)
    {
        return Ok(components.to_vec());
    }

    let mut result = components.to_vec();
    result[master_index] = master.with_property_line(exdate.to_property("EXDATE"));
    tracing::trace!(exdate = %value, "Added EXDATE to master");
    Ok(result)
}

/// Applies `fields` under `scope`: the whole series replaces the master,
/// a single occurrence upserts its override.
///
/// ## Errors
/// Propagates the errors of the dispatched operation.
pub fn apply(
    components: &[EventComponent],
    scope: &EditScope,
    fields: &EventFields,
) -> RfcResult<Vec<EventComponent>> {
    match scope {
        EditScope::WholeSeries => replace_master(components, fields),
        EditScope::SingleOccurrence(target) => {
            upsert_occurrence_override(components, target, fields)
        }
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod tests;
