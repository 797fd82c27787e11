//! Incremental sync support: change listing and tombstone retention.

use calcard_core::config::Settings;
use calcard_db::ledger::{ChangeSet, VersionLedger};
use calcard_db::store::Store;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::ServiceResult;

/// ## Summary
/// Lists what changed in a collection since a client's last revision.
///
/// `None` asks for everything, as on a client's first sync.
///
/// ## Errors
/// Returns storage errors from the ledger.
#[tracing::instrument(skip(ledger))]
pub async fn collection_changes<S: Store>(
    ledger: &VersionLedger<S>,
    collection_id: Uuid,
    since: Option<i64>,
) -> ServiceResult<ChangeSet> {
    let changes = ledger
        .changes_since(collection_id, since.unwrap_or(0))
        .await?;
    tracing::debug!(
        ctag = changes.ctag,
        changed = changes.changed.len(),
        deleted = changes.deleted.len(),
        "Collection changes listed"
    );
    Ok(changes)
}

/// ## Summary
/// Drops tombstones older than `sync.tombstone_retention_days` as of `now`.
///
/// ## Errors
/// Returns storage errors from the ledger.
#[tracing::instrument(skip(ledger, settings))]
pub async fn purge_expired_tombstones<S: Store>(
    ledger: &VersionLedger<S>,
    settings: &Settings,
    now: DateTime<Utc>,
) -> ServiceResult<usize> {
    let cutoff = now - Duration::seconds(settings.tombstone_retention_secs());
    Ok(ledger.purge_tombstones(cutoff).await?)
}

#[cfg(test)]
mod tests {
    use calcard_core::types::ResourceType;
    use calcard_db::ledger::Precondition;
    use calcard_db::store::MemoryStore;

    use super::*;
    use crate::carddav::object::{PutContactContext, delete_contact, put_contact};

    async fn ledger_with_deleted_contact() -> (VersionLedger<MemoryStore>, Uuid) {
        let ledger = VersionLedger::new(MemoryStore::new());
        let book = Uuid::new_v4();
        let ctx = PutContactContext {
            address_book_id: book,
            resource_name: None,
            precondition: Precondition::None,
        };
        for uid in ["c1", "c2"] {
            put_contact(
                &ledger,
                &ctx,
                &format!("BEGIN:VCARD\r\nVERSION:3.0\r\nUID:{uid}\r\nFN:{uid}\r\nEND:VCARD\r\n"),
            )
            .await
            .unwrap();
        }
        delete_contact(&ledger, book, "c1", Precondition::None)
            .await
            .unwrap();
        (ledger, book)
    }

    #[test_log::test(tokio::test)]
    async fn first_sync_sees_everything_later_syncs_see_deltas() {
        let (ledger, book) = ledger_with_deleted_contact().await;

        let full = collection_changes(&ledger, book, None).await.unwrap();
        assert_eq!(full.ctag, 3);
        assert_eq!(full.changed.len(), 1);
        assert_eq!(full.changed[0].resource_type, ResourceType::Contact);
        assert_eq!(full.deleted.len(), 1);

        let delta = collection_changes(&ledger, book, Some(2)).await.unwrap();
        assert!(delta.changed.is_empty());
        assert_eq!(delta.deleted[0].uid, "c1");
    }

    #[test_log::test(tokio::test)]
    async fn retention_window_protects_recent_tombstones() {
        let (ledger, book) = ledger_with_deleted_contact().await;
        let settings = Settings::default();

        let purged = purge_expired_tombstones(&ledger, &settings, Utc::now())
            .await
            .unwrap();
        assert_eq!(purged, 0);

        let later = Utc::now() + Duration::days(91);
        let purged = purge_expired_tombstones(&ledger, &settings, later)
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(
            collection_changes(&ledger, book, None)
                .await
                .unwrap()
                .deleted
                .is_empty()
        );
    }
}
