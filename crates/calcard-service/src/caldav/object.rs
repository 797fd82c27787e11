//! Calendar object storage service.
//!
//! Every write parses the stored text, transforms its components with the
//! series editor, re-serializes and commits through the [`VersionLedger`],
//! so `ETag` and ctag always move together.

use calcard_core::config::Settings;
use calcard_core::error::CoreError;
use calcard_core::types::ResourceType;
use calcard_db::ledger::{
    CommitOutcome, DeleteOutcome, ModifyOutcome, Mutation, Precondition, ResourceWrite,
    VersionLedger,
};
use calcard_db::model::{CachedFields, ResourceContent};
use calcard_db::store::Store;
use calcard_rfc::error::RfcError;
use calcard_rfc::rfc::ical::build::{EventFields, serialize};
use calcard_rfc::rfc::ical::core::ParsedResource;
use calcard_rfc::rfc::ical::parse::parse;
use calcard_rfc::rfc::ical::series::{self, EditScope, OccurrenceTarget};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// Result of a PUT operation on a calendar object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutObjectResult {
    /// `ETag` of the created or updated object.
    pub etag: String,
    /// Collection ctag after the write.
    pub ctag: i64,
    pub resource_name: String,
    /// Whether the object was newly created (true) or updated (false).
    pub created: bool,
}

impl From<CommitOutcome> for PutObjectResult {
    fn from(outcome: CommitOutcome) -> Self {
        Self {
            etag: outcome.etag,
            ctag: outcome.ctag,
            resource_name: outcome.resource_name,
            created: outcome.created,
        }
    }
}

/// Context for a raw iCalendar PUT.
#[derive(Debug, Clone)]
pub struct PutObjectContext {
    /// Collection ID where the object will be stored.
    pub collection_id: Uuid,
    /// Path segment requested by the client for a new object.
    pub resource_name: Option<String>,
    pub precondition: Precondition,
}

/// Context for a structured event edit.
#[derive(Debug, Clone)]
pub struct PutEventContext {
    pub collection_id: Uuid,
    pub scope: EditScope,
    pub precondition: Precondition,
}

/// Validates a resource and turns it into ledger content.
pub(crate) fn calendar_content(resource: &ParsedResource) -> ServiceResult<ResourceContent> {
    resource.validate()?;
    Ok(ResourceContent::new(
        serialize(resource),
        CachedFields::Event(resource.display()),
    ))
}

/// ## Summary
/// Stores or replaces a calendar object from client-supplied iCalendar text.
///
/// The text is parsed and validated, then stored in re-serialized form.
///
/// ## Errors
/// Returns a parse or validation error for malformed input and
/// [`ServiceError::Conflict`] if the precondition fails.
///
/// ## Side Effects
/// Bumps the collection ctag.
#[tracing::instrument(skip(ledger, ical), fields(
    collection_id = %ctx.collection_id,
    resource_name = ?ctx.resource_name,
    precondition = ?ctx.precondition
))]
pub async fn put_calendar_object<S: Store>(
    ledger: &VersionLedger<S>,
    ctx: &PutObjectContext,
    ical: &str,
) -> ServiceResult<PutObjectResult> {
    tracing::debug!("Processing PUT calendar object");

    let resource = parse(ical)?;
    let content = calendar_content(&resource)?;
    let uid = resource.uid().ok_or_else(|| {
        ServiceError::ValidationError("calendar object has no UID".to_string())
    })?;

    let outcome = ledger
        .commit(
            ResourceWrite {
                collection_id: ctx.collection_id,
                uid,
                resource_name: ctx.resource_name.clone(),
                content,
            },
            ctx.precondition.clone(),
        )
        .await?;

    tracing::debug!(etag = %outcome.etag, created = outcome.created, "Calendar object stored");
    Ok(outcome.into())
}

/// ## Summary
/// Applies a structured event edit under an edit scope.
///
/// A whole-series edit replaces the master (creating the resource if
/// needed) and keeps every override. A single-occurrence edit upserts the
/// override for that occurrence and requires the series to exist.
///
/// ## Errors
/// Returns [`ServiceError::NotFound`] for an occurrence edit of a missing
/// series, a validation error for invalid fields and
/// [`ServiceError::Conflict`] if the precondition fails.
///
/// ## Side Effects
/// Bumps the collection ctag.
#[tracing::instrument(skip(ledger, settings, event), fields(
    collection_id = %ctx.collection_id,
    uid = %event.uid,
    scope = ?ctx.scope
))]
pub async fn put_event<S: Store>(
    ledger: &VersionLedger<S>,
    settings: &Settings,
    ctx: &PutEventContext,
    event: &EventFields,
) -> ServiceResult<PutObjectResult> {
    let prodid = settings.calendar.prodid.as_str();

    let outcome = ledger
        .modify(
            ctx.collection_id,
            ResourceType::Calendar,
            &event.uid,
            ctx.precondition.clone(),
            |existing| -> ServiceResult<Mutation> {
                let resource = match existing {
                    Some(row) => parse(&row.content)?,
                    None if matches!(ctx.scope, EditScope::SingleOccurrence(_)) => {
                        return Err(ServiceError::NotFound(format!("series '{}'", event.uid)));
                    }
                    None => ParsedResource::with_default_wrapper(prodid),
                };
                let components = series::apply(&resource.components, &ctx.scope, event)?;
                Ok(Mutation::Upsert(calendar_content(
                    &resource.with_components(components),
                )?))
            },
        )
        .await?;

    match outcome {
        ModifyOutcome::Written(written) => Ok(written.into()),
        ModifyOutcome::Deleted(_) => Err(CoreError::InvariantViolation(
            "event edit produced a delete",
        )
        .into()),
    }
}

/// ## Summary
/// Removes one occurrence from a stored series.
///
/// Drops the matching override or adds an EXDATE to the master. When the
/// resource has no master left to carry the exception, or nothing remains
/// after dropping the override, the whole resource is deleted.
///
/// ## Errors
/// Returns [`ServiceError::NotFound`] if the resource does not exist and
/// [`ServiceError::Conflict`] if the precondition fails.
///
/// ## Side Effects
/// Bumps the collection ctag; a delete also records a tombstone.
#[tracing::instrument(skip(ledger), fields(recurrence_id = %target.recurrence_id))]
pub async fn exclude_occurrence<S: Store>(
    ledger: &VersionLedger<S>,
    collection_id: Uuid,
    uid: &str,
    target: &OccurrenceTarget,
    precondition: Precondition,
) -> ServiceResult<ModifyOutcome> {
    ledger
        .modify(
            collection_id,
            ResourceType::Calendar,
            uid,
            precondition,
            |existing| -> ServiceResult<Mutation> {
                let Some(row) = existing else {
                    return Err(ServiceError::NotFound(format!("calendar object '{uid}'")));
                };
                let resource = parse(&row.content)?;

                match series::exclude_occurrence(&resource.components, target) {
                    Ok(components) if components.is_empty() => {
                        tracing::debug!("Last component removed, deleting resource");
                        Ok(Mutation::Delete)
                    }
                    Ok(components) => Ok(Mutation::Upsert(calendar_content(
                        &resource.with_components(components),
                    )?)),
                    Err(RfcError::NoMaster { uid }) => {
                        tracing::debug!(%uid, "No master to carry EXDATE, deleting resource");
                        Ok(Mutation::Delete)
                    }
                    Err(error) => Err(error.into()),
                }
            },
        )
        .await
}

/// ## Summary
/// Deletes a calendar object.
///
/// ## Errors
/// Returns [`ServiceError::NotFound`] if it does not exist.
///
/// ## Side Effects
/// Records a tombstone and bumps the collection ctag.
#[tracing::instrument(skip(ledger))]
pub async fn delete_event<S: Store>(
    ledger: &VersionLedger<S>,
    collection_id: Uuid,
    uid: &str,
    precondition: Precondition,
) -> ServiceResult<DeleteOutcome> {
    Ok(ledger
        .delete(collection_id, ResourceType::Calendar, uid, precondition)
        .await?)
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
