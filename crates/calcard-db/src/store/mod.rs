//! Persistence collaborator interface.
//!
//! A [`Store`] owns the transaction boundary. [`Store::begin`] locks every
//! collection the transaction will touch, in ascending id order, and holds
//! those locks until the transaction is committed or dropped. Dropping a
//! transaction without committing discards its writes.

mod memory;

use calcard_core::types::ResourceType;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::{MemoryStore, MemoryTransaction};

use crate::error::DbResult;
use crate::model::{CollectionSnapshot, CollectionVersion, ResourceRow, Tombstone};

pub trait Store: Send + Sync {
    type Transaction: StoreTransaction;

    /// ## Summary
    /// Opens a transaction over `collections`.
    ///
    /// Implementations serialize transactions per collection and acquire
    /// locks in ascending id order so opposite-direction moves cannot
    /// deadlock.
    ///
    /// ## Errors
    /// Returns a storage error if the transaction cannot be started.
    fn begin<'a>(&'a self, collections: &'a [Uuid]) -> BoxFuture<'a, DbResult<Self::Transaction>>;

    /// Reads the committed state of one collection.
    ///
    /// ## Errors
    /// Returns a storage error if the read fails.
    fn snapshot(&self, collection: Uuid) -> BoxFuture<'_, DbResult<CollectionSnapshot>>;

    /// Deletes tombstones recorded before `older_than`, returning how many
    /// were removed.
    ///
    /// ## Errors
    /// Returns a storage error if the purge fails.
    fn purge_tombstones(&self, older_than: DateTime<Utc>) -> BoxFuture<'_, DbResult<usize>>;
}

/// Reads and writes inside one transaction. Every method fails with
/// [`crate::error::DbError::NotLocked`] for a collection the transaction did
/// not lock.
pub trait StoreTransaction: Send {
    fn load_resource<'a>(
        &'a mut self,
        collection: Uuid,
        resource_type: ResourceType,
        uid: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<ResourceRow>>>;

    fn load_resources(&mut self, collection: Uuid) -> BoxFuture<'_, DbResult<Vec<ResourceRow>>>;

    /// Inserts or replaces the row keyed by (collection, type, uid).
    fn upsert_resource(&mut self, row: ResourceRow) -> BoxFuture<'_, DbResult<()>>;

    /// Removes a row, returning it if it existed.
    fn delete_resource<'a>(
        &'a mut self,
        collection: Uuid,
        resource_type: ResourceType,
        uid: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<ResourceRow>>>;

    fn record_tombstone(&mut self, tombstone: Tombstone) -> BoxFuture<'_, DbResult<()>>;

    /// Creates the collection's version row at ctag 0 if it does not exist.
    fn ensure_collection(&mut self, collection: Uuid)
    -> BoxFuture<'_, DbResult<CollectionVersion>>;

    /// Bumps the collection's ctag by one and returns the new version.
    fn increment_ctag(&mut self, collection: Uuid) -> BoxFuture<'_, DbResult<CollectionVersion>>;

    /// Publishes every write of this transaction at once.
    fn commit(self) -> BoxFuture<'static, DbResult<()>>;
}
