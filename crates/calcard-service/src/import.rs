//! Bulk import of uploaded `.ics` and `.vcf` files.
//!
//! Each entry of a file goes through the same codec and ledger path as a
//! single create. Entries that fail are skipped and counted; only a storage
//! failure aborts the batch.

use calcard_core::config::Settings;
use calcard_db::ledger::{Precondition, ResourceWrite, VersionLedger};
use calcard_db::model::ResourceContent;
use calcard_db::store::Store;
use calcard_rfc::rfc::ical::core::ParsedResource;
use calcard_rfc::rfc::ical::parse::split_calendar_by_uid;
use calcard_rfc::rfc::vcard::split_vcards;
use serde::Serialize;
use uuid::Uuid;

use crate::caldav::object::calendar_content;
use crate::carddav::object::contact_content;
use crate::error::{ServiceError, ServiceResult};

/// Outcome of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

impl ImportSummary {
    /// Counts a failed entry, or hands back errors that must abort the batch.
    fn skip(&mut self, error: ServiceError) -> ServiceResult<()> {
        if matches!(error, ServiceError::DatabaseError(_)) {
            return Err(error);
        }
        tracing::warn!(%error, "Skipping import entry");
        self.skipped += 1;
        Ok(())
    }
}

/// Creates one entry; an existing UID is never overwritten.
async fn create_entry<S: Store>(
    ledger: &VersionLedger<S>,
    collection_id: Uuid,
    uid: String,
    content: ResourceContent,
) -> ServiceResult<()> {
    ledger
        .commit(
            ResourceWrite {
                collection_id,
                uid,
                resource_name: None,
                content,
            },
            Precondition::IfNoneMatch,
        )
        .await?;
    Ok(())
}

fn calendar_entry(resource: &ParsedResource) -> ServiceResult<(String, ResourceContent)> {
    let content = calendar_content(resource)?;
    let uid = resource
        .uid()
        .ok_or_else(|| ServiceError::ValidationError("event has no UID".to_string()))?;
    Ok((uid, content))
}

/// ## Summary
/// Imports every event series of a calendar file into a collection.
///
/// VEVENTs sharing a UID are stored together as one resource; VEVENTs
/// without UID get a generated one. Entries beyond `import.max_entries`
/// are skipped.
///
/// ## Errors
/// Returns a parse error if the file's component boundaries do not match,
/// and storage errors from the ledger.
///
/// ## Side Effects
/// Bumps the collection ctag once per imported resource.
#[tracing::instrument(skip(ledger, settings, ical), fields(bytes = ical.len()))]
pub async fn import_calendar<S: Store>(
    ledger: &VersionLedger<S>,
    settings: &Settings,
    collection_id: Uuid,
    ical: &str,
) -> ServiceResult<ImportSummary> {
    let resources = split_calendar_by_uid(ical)?;
    let mut summary = ImportSummary::default();

    for (index, resource) in resources.iter().enumerate() {
        if index >= settings.import.max_entries {
            summary.skipped += resources.len() - index;
            tracing::warn!(
                max_entries = settings.import.max_entries,
                "Import entry limit reached"
            );
            break;
        }

        let result = match calendar_entry(resource) {
            Ok((uid, content)) => create_entry(ledger, collection_id, uid, content).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(()) => summary.imported += 1,
            Err(error) => summary.skip(error)?,
        }
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "Calendar import finished"
    );
    Ok(summary)
}

/// ## Summary
/// Imports every contact of a vCard file into an address book.
///
/// Cards with unbalanced BEGIN/END or without a name count as skipped.
/// Cards without UID get a generated one.
///
/// ## Errors
/// Returns storage errors from the ledger.
///
/// ## Side Effects
/// Bumps the address book ctag once per imported contact.
#[tracing::instrument(skip(ledger, settings, vcf), fields(bytes = vcf.len()))]
pub async fn import_contacts<S: Store>(
    ledger: &VersionLedger<S>,
    settings: &Settings,
    address_book_id: Uuid,
    vcf: &str,
) -> ServiceResult<ImportSummary> {
    let split = split_vcards(vcf);
    let mut summary = ImportSummary {
        imported: 0,
        skipped: split.malformed,
    };

    for (index, card) in split.cards.iter().enumerate() {
        if index >= settings.import.max_entries {
            summary.skipped += split.cards.len() - index;
            tracing::warn!(
                max_entries = settings.import.max_entries,
                "Import entry limit reached"
            );
            break;
        }

        let result = match contact_content(card) {
            Ok((uid, content)) => create_entry(ledger, address_book_id, uid, content).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(()) => summary.imported += 1,
            Err(error) => summary.skip(error)?,
        }
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "Contact import finished"
    );
    Ok(summary)
}
