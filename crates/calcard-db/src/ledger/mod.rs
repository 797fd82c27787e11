//! Resource versioning.
//!
//! Every resource write, delete and move goes through [`VersionLedger`],
//! which recomputes the `ETag`, bumps the collection ctag and records
//! tombstones inside the same store transaction as the row change. No reader
//! can see a new `ETag` without also seeing the ctag that came with it.

mod etag;

use calcard_core::types::ResourceType;
use calcard_core::util::resource_name::resource_name_for;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub use etag::etag_of;

use crate::error::{DbError, DbResult};
use crate::model::{CollectionVersion, ResourceContent, ResourceRow, Tombstone};
use crate::store::{Store, StoreTransaction};

/// Conditional-request guard checked against the stored row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Precondition {
    #[default]
    None,
    /// The stored `ETag` must equal this value; `*` means any existing row.
    IfMatch(String),
    /// No row may exist yet.
    IfNoneMatch,
}

impl Precondition {
    fn check(&self, current: Option<&ResourceRow>) -> DbResult<()> {
        match (self, current) {
            (Self::None, _) | (Self::IfNoneMatch, None) => Ok(()),
            (Self::IfMatch(expected), Some(row)) if expected == "*" || row.etag == *expected => {
                Ok(())
            }
            (Self::IfMatch(expected), Some(row)) => Err(DbError::conflict(format!(
                "If-Match {expected} does not match current ETag {}",
                row.etag
            ))),
            (Self::IfMatch(expected), None) => Err(DbError::conflict(format!(
                "If-Match {expected} given for a resource that does not exist"
            ))),
            (Self::IfNoneMatch, Some(_)) => Err(DbError::conflict("resource already exists")),
        }
    }
}

/// A full-content write of one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceWrite {
    pub collection_id: Uuid,
    pub uid: String,
    /// Requested path segment for a new resource. Ignored on update, where
    /// the existing name is kept.
    pub resource_name: Option<String>,
    pub content: ResourceContent,
}

/// What a closure passed to [`VersionLedger::modify`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Upsert(ResourceContent),
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    pub etag: String,
    pub ctag: i64,
    pub resource_name: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub ctag: i64,
    pub tombstone: Tombstone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyOutcome {
    Written(CommitOutcome),
    Deleted(DeleteOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub etag: String,
    pub resource_name: String,
    pub source_ctag: i64,
    pub target_ctag: i64,
}

/// Changes in one collection after a given revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Current ctag; the revision to ask from next time.
    pub ctag: i64,
    pub changed: Vec<ResourceRow>,
    pub deleted: Vec<Tombstone>,
}

/// Picks the path segment for a new resource.
///
/// A requested name that is already taken is a conflict. A generated name
/// that collides falls back to a random one.
async fn resource_name_for_new<T: StoreTransaction>(
    tx: &mut T,
    collection: Uuid,
    resource_type: ResourceType,
    uid: &str,
    requested: Option<String>,
) -> DbResult<String> {
    let existing = tx.load_resources(collection).await?;
    let taken = |name: &str| existing.iter().any(|r| r.resource_name == name);

    if let Some(requested) = requested.filter(|n| !n.trim().is_empty()) {
        if taken(&requested) {
            return Err(DbError::conflict(format!(
                "resource name '{requested}' is already in use"
            )));
        }
        return Ok(requested);
    }

    let generated = resource_name_for(uid, resource_type);
    if !taken(&generated) {
        return Ok(generated);
    }
    let fallback = format!("{}.{}", Uuid::new_v4(), resource_type.extension());
    tracing::debug!(%generated, %fallback, "Generated resource name already taken");
    Ok(fallback)
}

async fn write_row<T: StoreTransaction>(
    tx: &mut T,
    collection: Uuid,
    uid: &str,
    requested_name: Option<String>,
    content: ResourceContent,
    existing: Option<ResourceRow>,
) -> DbResult<CommitOutcome> {
    let resource_type = content.resource_type();
    let created = existing.is_none();
    let resource_name = match existing {
        Some(row) => row.resource_name,
        None => {
            resource_name_for_new(tx, collection, resource_type, uid, requested_name).await?
        }
    };

    let version = tx.increment_ctag(collection).await?;
    let etag = etag_of(&content.content);

    tx.upsert_resource(ResourceRow {
        resource_type,
        collection_id: collection,
        uid: uid.to_string(),
        resource_name: resource_name.clone(),
        content: content.content,
        etag: etag.clone(),
        revision: version.ctag,
        last_modified: version.updated_at,
        cached: content.cached,
    })
    .await?;

    Ok(CommitOutcome {
        etag,
        ctag: version.ctag,
        resource_name,
        created,
    })
}

async fn delete_row<T: StoreTransaction>(
    tx: &mut T,
    collection: Uuid,
    resource_type: ResourceType,
    uid: &str,
) -> DbResult<DeleteOutcome> {
    let Some(row) = tx.delete_resource(collection, resource_type, uid).await? else {
        return Err(DbError::NotFound {
            collection_id: collection,
            uid: uid.to_string(),
        });
    };

    let version = tx.increment_ctag(collection).await?;
    let tombstone = Tombstone {
        resource_type,
        collection_id: collection,
        uid: row.uid,
        resource_name: row.resource_name,
        deleted_at: version.updated_at,
        revision: version.ctag,
    };
    tx.record_tombstone(tombstone.clone()).await?;

    Ok(DeleteOutcome {
        ctag: version.ctag,
        tombstone,
    })
}

fn check_type(content: &ResourceContent, expected: ResourceType) -> DbResult<()> {
    if content.resource_type() == expected {
        Ok(())
    } else {
        Err(DbError::Validation(format!(
            "{} content written as {expected}",
            content.resource_type()
        )))
    }
}

/// Computes `ETag`s and keeps ctags and tombstones in step with resource writes.
#[derive(Debug, Clone)]
pub struct VersionLedger<S> {
    store: S,
}

impl<S: Store> VersionLedger<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// ## Summary
    /// Creates the collection's version row at ctag 0 if missing.
    ///
    /// ## Errors
    /// Returns a storage error if the transaction fails.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_collection(&self, collection: Uuid) -> DbResult<CollectionVersion> {
        let mut tx = self.store.begin(&[collection]).await?;
        let version = tx.ensure_collection(collection).await?;
        tx.commit().await?;
        Ok(version)
    }

    /// Current ctag of a collection, 0 if it was never written.
    ///
    /// ## Errors
    /// Returns a storage error if the read fails.
    pub async fn ctag(&self, collection: Uuid) -> DbResult<i64> {
        Ok(self.store.snapshot(collection).await?.ctag())
    }

    /// ## Errors
    /// Returns a storage error if the read fails.
    pub async fn load_resources(&self, collection: Uuid) -> DbResult<Vec<ResourceRow>> {
        Ok(self.store.snapshot(collection).await?.resources)
    }

    /// ## Errors
    /// Returns a storage error if the read fails.
    pub async fn load_resource(
        &self,
        collection: Uuid,
        resource_type: ResourceType,
        uid: &str,
    ) -> DbResult<Option<ResourceRow>> {
        Ok(self
            .store
            .snapshot(collection)
            .await?
            .resources
            .into_iter()
            .find(|r| r.resource_type == resource_type && r.uid == uid))
    }

    /// ## Summary
    /// Writes a resource and bumps its collection's ctag in one transaction.
    ///
    /// ## Errors
    /// Returns [`DbError::Conflict`] if the precondition fails or a requested
    /// resource name is taken.
    ///
    /// ## Side Effects
    /// Increments the collection ctag by exactly one on success.
    #[tracing::instrument(skip(self, write), fields(collection_id = %write.collection_id, uid = %write.uid))]
    pub async fn commit(
        &self,
        write: ResourceWrite,
        precondition: Precondition,
    ) -> DbResult<CommitOutcome> {
        let collection = write.collection_id;
        let resource_type = write.content.resource_type();

        let mut tx = self.store.begin(&[collection]).await?;
        let existing = tx.load_resource(collection, resource_type, &write.uid).await?;
        precondition.check(existing.as_ref())?;

        let outcome = write_row(
            &mut tx,
            collection,
            &write.uid,
            write.resource_name,
            write.content,
            existing,
        )
        .await?;
        tx.commit().await?;

        tracing::debug!(ctag = outcome.ctag, etag = %outcome.etag, "Committed resource");
        Ok(outcome)
    }

    /// ## Summary
    /// Loads a resource, lets `f` decide its new state and applies that
    /// decision, all inside one transaction.
    ///
    /// `f` sees the current row (or `None`) and must not have side effects:
    /// when it fails, nothing is written.
    ///
    /// ## Errors
    /// Returns the closure's error, or a [`DbError`] converted into `E` for
    /// a failed precondition, a missing row on delete, or a storage failure.
    ///
    /// ## Side Effects
    /// Increments the collection ctag by exactly one on success.
    #[tracing::instrument(skip(self, f))]
    pub async fn modify<F, E>(
        &self,
        collection: Uuid,
        resource_type: ResourceType,
        uid: &str,
        precondition: Precondition,
        f: F,
    ) -> Result<ModifyOutcome, E>
    where
        F: FnOnce(Option<&ResourceRow>) -> Result<Mutation, E> + Send,
        E: From<DbError>,
    {
        let mut tx = self.store.begin(&[collection]).await?;
        let existing = tx.load_resource(collection, resource_type, uid).await?;
        precondition.check(existing.as_ref())?;

        let mutation = f(existing.as_ref())?;
        let outcome = match mutation {
            Mutation::Upsert(content) => {
                check_type(&content, resource_type)?;
                ModifyOutcome::Written(
                    write_row(&mut tx, collection, uid, None, content, existing).await?,
                )
            }
            Mutation::Delete => {
                ModifyOutcome::Deleted(delete_row(&mut tx, collection, resource_type, uid).await?)
            }
        };
        tx.commit().await?;

        Ok(outcome)
    }

    /// ## Summary
    /// Deletes a resource, records its tombstone and bumps the ctag.
    ///
    /// ## Errors
    /// Returns [`DbError::NotFound`] if the resource does not exist and
    /// [`DbError::Conflict`] if the precondition fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete(
        &self,
        collection: Uuid,
        resource_type: ResourceType,
        uid: &str,
        precondition: Precondition,
    ) -> DbResult<DeleteOutcome> {
        let mut tx = self.store.begin(&[collection]).await?;
        let existing = tx.load_resource(collection, resource_type, uid).await?;
        precondition.check(existing.as_ref())?;

        let outcome = delete_row(&mut tx, collection, resource_type, uid).await?;
        tx.commit().await?;

        tracing::debug!(ctag = outcome.ctag, "Deleted resource");
        Ok(outcome)
    }

    /// ## Summary
    /// Appends a tombstone without touching any resource row or the ctag.
    ///
    /// The tombstone carries the collection's current ctag as its revision.
    ///
    /// ## Errors
    /// Returns a storage error if the transaction fails.
    #[tracing::instrument(skip(self))]
    pub async fn record_tombstone(
        &self,
        resource_type: ResourceType,
        collection: Uuid,
        uid: &str,
        resource_name: &str,
    ) -> DbResult<Tombstone> {
        let mut tx = self.store.begin(&[collection]).await?;
        let version = tx.ensure_collection(collection).await?;
        let tombstone = Tombstone {
            resource_type,
            collection_id: collection,
            uid: uid.to_string(),
            resource_name: resource_name.to_string(),
            deleted_at: Utc::now(),
            revision: version.ctag,
        };
        tx.record_tombstone(tombstone.clone()).await?;
        tx.commit().await?;
        Ok(tombstone)
    }

    /// ## Summary
    /// Moves a resource between collections.
    ///
    /// The row is inserted into the target and deleted from the source, the
    /// source gets a tombstone and both ctags are bumped, all in one
    /// transaction holding both collection locks. The resource name, content
    /// and `ETag` are kept.
    ///
    /// ## Errors
    /// Returns a validation error when source and target are the same,
    /// [`DbError::NotFound`] if the source row is missing and
    /// [`DbError::Conflict`] if the target already has the UID or name.
    #[tracing::instrument(skip(self))]
    pub async fn move_resource(
        &self,
        from: Uuid,
        to: Uuid,
        resource_type: ResourceType,
        uid: &str,
    ) -> DbResult<MoveOutcome> {
        if from == to {
            return Err(DbError::Validation(
                "source and target collection are the same".to_string(),
            ));
        }

        let mut tx = self.store.begin(&[from, to]).await?;
        let Some(row) = tx.load_resource(from, resource_type, uid).await? else {
            return Err(DbError::NotFound {
                collection_id: from,
                uid: uid.to_string(),
            });
        };

        if tx.load_resource(to, resource_type, uid).await?.is_some() {
            return Err(DbError::conflict(format!(
                "target collection already holds UID '{uid}'"
            )));
        }
        if tx
            .load_resources(to)
            .await?
            .iter()
            .any(|r| r.resource_name == row.resource_name)
        {
            return Err(DbError::conflict(format!(
                "target collection already holds resource name '{}'",
                row.resource_name
            )));
        }

        let target = tx.increment_ctag(to).await?;
        tx.upsert_resource(ResourceRow {
            collection_id: to,
            revision: target.ctag,
            last_modified: target.updated_at,
            ..row.clone()
        })
        .await?;
        let deleted = delete_row(&mut tx, from, resource_type, uid).await?;
        tx.commit().await?;

        tracing::debug!(
            source_ctag = deleted.ctag,
            target_ctag = target.ctag,
            "Moved resource"
        );
        Ok(MoveOutcome {
            etag: row.etag,
            resource_name: row.resource_name,
            source_ctag: deleted.ctag,
            target_ctag: target.ctag,
        })
    }

    /// ## Summary
    /// Lists rows written and tombstones recorded after `revision`.
    ///
    /// A tombstone whose name is live again (deleted, then recreated) is
    /// left out in favour of the live row.
    ///
    /// ## Errors
    /// Returns a storage error if the read fails.
    #[tracing::instrument(skip(self))]
    pub async fn changes_since(&self, collection: Uuid, revision: i64) -> DbResult<ChangeSet> {
        let snapshot = self.store.snapshot(collection).await?;
        let ctag = snapshot.ctag();

        let deleted = snapshot
            .tombstones
            .into_iter()
            .filter(|t| t.revision > revision)
            .filter(|t| {
                !snapshot
                    .resources
                    .iter()
                    .any(|r| r.resource_name == t.resource_name)
            })
            .collect();
        let changed = snapshot
            .resources
            .into_iter()
            .filter(|r| r.revision > revision)
            .collect();

        Ok(ChangeSet {
            ctag,
            changed,
            deleted,
        })
    }

    /// ## Summary
    /// Removes tombstones recorded before `older_than`.
    ///
    /// ## Errors
    /// Returns a storage error if the purge fails.
    #[tracing::instrument(skip(self))]
    pub async fn purge_tombstones(&self, older_than: DateTime<Utc>) -> DbResult<usize> {
        let purged = self.store.purge_tombstones(older_than).await?;
        tracing::debug!(purged, "Purged tombstones");
        Ok(purged)
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
