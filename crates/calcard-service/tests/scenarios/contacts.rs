//! Contact scenarios: moves between address books and bulk import.

use calcard_core::types::ResourceType;
use calcard_db::ledger::Precondition;
use calcard_service::carddav::object::{PutContactContext, move_contact, put_contact};
use calcard_service::import::{ImportSummary, import_contacts};
use calcard_service::sync::collection_changes;
use uuid::Uuid;

use super::helpers::*;

const JANE: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:c1\r\nFN:Jane Doe\r\nEMAIL;TYPE=INTERNET:jane@example.com\r\nEND:VCARD\r\n";

/// ## Summary
/// Moving `c1` from book1 to book2 removes it from book1, leaves a tombstone
/// there, stores it in book2 and bumps both ctags.
#[test_log::test(tokio::test)]
async fn move_contact_between_books() {
    let env = TestEnv::new();
    let (book1, book2) = (Uuid::new_v4(), Uuid::new_v4());
    let put = put_contact(
        &env.ledger,
        &PutContactContext {
            address_book_id: book1,
            resource_name: None,
            precondition: Precondition::IfNoneMatch,
        },
        JANE,
    )
    .await
    .expect("contact should be stored");
    env.ledger
        .ensure_collection(book2)
        .await
        .expect("target book should exist");
    let (before1, before2) = (
        env.ledger.ctag(book1).await.expect("ctag"),
        env.ledger.ctag(book2).await.expect("ctag"),
    );

    let moved = move_contact(&env.ledger, book1, book2, "c1")
        .await
        .expect("move should succeed");
    assert_eq!(moved.etag, put.etag);
    assert_eq!(moved.source_ctag, before1 + 1);
    assert_eq!(moved.target_ctag, before2 + 1);

    assert!(
        env.ledger
            .load_resource(book1, ResourceType::Contact, "c1")
            .await
            .expect("load")
            .is_none()
    );
    assert_eq!(env.etag(book2, ResourceType::Contact, "c1").await, put.etag);

    let changes = collection_changes(&env.ledger, book1, Some(before1))
        .await
        .expect("changes");
    assert!(changes.changed.is_empty());
    assert_eq!(changes.deleted.len(), 1);
    assert_eq!(changes.deleted[0].uid, "c1");
    assert_eq!(changes.deleted[0].resource_name, put.resource_name);
}

/// ## Summary
/// Moving onto a book that already holds the UID is refused and changes
/// neither book.
#[test_log::test(tokio::test)]
async fn move_onto_existing_uid_conflicts() {
    let env = TestEnv::new();
    let (book1, book2) = (Uuid::new_v4(), Uuid::new_v4());
    for book in [book1, book2] {
        put_contact(
            &env.ledger,
            &PutContactContext {
                address_book_id: book,
                resource_name: None,
                precondition: Precondition::None,
            },
            JANE,
        )
        .await
        .expect("contact should be stored");
    }

    let err = move_contact(&env.ledger, book1, book2, "c1")
        .await
        .expect_err("move should conflict");
    assert!(err.is_precondition_failure());
    assert_eq!(env.ledger.ctag(book1).await.expect("ctag"), 1);
    assert_eq!(env.ledger.ctag(book2).await.expect("ctag"), 1);
}

/// ## Summary
/// A three-card file whose second card never closes imports the other two.
#[test_log::test(tokio::test)]
async fn import_skips_broken_card() {
    let env = TestEnv::new();
    let book = Uuid::new_v4();
    let vcf = "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:a\r\nFN:Alice\r\nEND:VCARD\r\n\
BEGIN:VCARD\r\nVERSION:3.0\r\nUID:b\r\nFN:Broken\r\n\
BEGIN:VCARD\r\nVERSION:3.0\r\nUID:c\r\nFN:Carol\r\nEND:VCARD\r\n";

    let summary = import_contacts(&env.ledger, &env.settings, book, vcf)
        .await
        .expect("import should succeed");
    assert_eq!(summary, ImportSummary { imported: 2, skipped: 1 });

    let mut uids: Vec<String> = env
        .ledger
        .load_resources(book)
        .await
        .expect("load")
        .into_iter()
        .map(|r| r.uid)
        .collect();
    uids.sort_unstable();
    assert_eq!(uids, vec!["a", "c"]);
    assert_eq!(env.ledger.ctag(book).await.expect("ctag"), 2);
}
