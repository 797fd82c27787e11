//! Contact storage service.

use calcard_core::types::ResourceType;
use calcard_db::ledger::{DeleteOutcome, MoveOutcome, Precondition, ResourceWrite, VersionLedger};
use calcard_db::model::{CachedFields, ResourceContent};
use calcard_db::store::Store;
use calcard_rfc::rfc::vcard::{ContactFields, VCard, build_vcard, parse_vcard, serialize_vcard};
use uuid::Uuid;

use crate::caldav::object::PutObjectResult;
use crate::error::ServiceResult;

/// Context for a contact PUT.
#[derive(Debug, Clone)]
pub struct PutContactContext {
    pub address_book_id: Uuid,
    /// Path segment requested by the client for a new contact.
    pub resource_name: Option<String>,
    pub precondition: Precondition,
}

/// Gives a card without UID a generated one and turns it into ledger content.
pub(crate) fn contact_content(card: &VCard) -> ServiceResult<(String, ResourceContent)> {
    card.validate()?;
    let card = match card.uid() {
        Some(_) => card.clone(),
        None => {
            let uid = Uuid::new_v4().to_string();
            tracing::debug!(%uid, "Assigning generated UID to contact");
            card.with_uid(&uid)
        }
    };
    let uid = card.uid().unwrap_or_default();

    Ok((
        uid,
        ResourceContent::new(serialize_vcard(&card), CachedFields::Contact(card.display())),
    ))
}

async fn store_card<S: Store>(
    ledger: &VersionLedger<S>,
    ctx: &PutContactContext,
    card: &VCard,
) -> ServiceResult<PutObjectResult> {
    let (uid, content) = contact_content(card)?;
    let outcome = ledger
        .commit(
            ResourceWrite {
                collection_id: ctx.address_book_id,
                uid,
                resource_name: ctx.resource_name.clone(),
                content,
            },
            ctx.precondition.clone(),
        )
        .await?;
    Ok(outcome.into())
}

/// ## Summary
/// Stores or replaces a contact from client-supplied vCard text.
///
/// The text must hold exactly one VCARD naming its subject. A card without
/// UID gets a generated one.
///
/// ## Errors
/// Returns a parse or validation error for malformed input and
/// [`crate::error::ServiceError::Conflict`] if the precondition fails.
///
/// ## Side Effects
/// Bumps the address book ctag.
#[tracing::instrument(skip(ledger, vcard), fields(
    address_book_id = %ctx.address_book_id,
    resource_name = ?ctx.resource_name
))]
pub async fn put_contact<S: Store>(
    ledger: &VersionLedger<S>,
    ctx: &PutContactContext,
    vcard: &str,
) -> ServiceResult<PutObjectResult> {
    let card = parse_vcard(vcard)?;
    let result = store_card(ledger, ctx, &card).await?;
    tracing::debug!(etag = %result.etag, created = result.created, "Contact stored");
    Ok(result)
}

/// ## Summary
/// Stores or replaces a contact built from structured fields.
///
/// ## Errors
/// Returns a validation error if the fields name nobody and
/// [`crate::error::ServiceError::Conflict`] if the precondition fails.
#[tracing::instrument(skip(ledger, contact), fields(
    address_book_id = %ctx.address_book_id,
    uid = %contact.uid
))]
pub async fn put_contact_fields<S: Store>(
    ledger: &VersionLedger<S>,
    ctx: &PutContactContext,
    contact: &ContactFields,
) -> ServiceResult<PutObjectResult> {
    let card = build_vcard(contact)?;
    store_card(ledger, ctx, &card).await
}

/// ## Errors
/// Returns [`crate::error::ServiceError::NotFound`] if the contact does not exist.
#[tracing::instrument(skip(ledger))]
pub async fn delete_contact<S: Store>(
    ledger: &VersionLedger<S>,
    address_book_id: Uuid,
    uid: &str,
    precondition: Precondition,
) -> ServiceResult<DeleteOutcome> {
    Ok(ledger
        .delete(address_book_id, ResourceType::Contact, uid, precondition)
        .await?)
}

/// ## Summary
/// Moves a contact to another address book.
///
/// ## Errors
/// Returns [`crate::error::ServiceError::NotFound`] if the contact is
/// missing and [`crate::error::ServiceError::Conflict`] if the target
/// already holds its UID or resource name.
///
/// ## Side Effects
/// Tombstones the contact in the source; bumps both ctags.
#[tracing::instrument(skip(ledger))]
pub async fn move_contact<S: Store>(
    ledger: &VersionLedger<S>,
    from: Uuid,
    to: Uuid,
    uid: &str,
) -> ServiceResult<MoveOutcome> {
    Ok(ledger
        .move_resource(from, to, ResourceType::Contact, uid)
        .await?)
}
