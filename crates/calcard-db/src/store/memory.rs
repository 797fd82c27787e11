//! In-process [`Store`] with per-collection locks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use calcard_core::types::ResourceType;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, ready};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{Store, StoreTransaction};
use crate::error::{DbError, DbResult};
use crate::model::{CollectionSnapshot, CollectionVersion, ResourceRow, Tombstone};

#[derive(Debug, Clone, Default)]
struct CollectionState {
    version: Option<CollectionVersion>,
    resources: BTreeMap<(ResourceType, String), ResourceRow>,
    tombstones: Vec<Tombstone>,
}

type SharedCollection = Arc<Mutex<CollectionState>>;

/// Keeps every collection in memory behind its own async mutex.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<Uuid, SharedCollection>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn collection(&self, id: Uuid) -> SharedCollection {
        if let Some(existing) = self.collections.read().await.get(&id) {
            return Arc::clone(existing);
        }
        let mut map = self.collections.write().await;
        Arc::clone(map.entry(id).or_default())
    }
}

/// Holds the locks of its collections and works on private copies of them.
pub struct MemoryTransaction {
    locked: Vec<(Uuid, OwnedMutexGuard<CollectionState>)>,
    working: HashMap<Uuid, CollectionState>,
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("collections", &self.locked.iter().map(|(id, _)| id).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl MemoryTransaction {
    fn state(&mut self, collection: Uuid) -> DbResult<&mut CollectionState> {
        self.working
            .get_mut(&collection)
            .ok_or(DbError::NotLocked(collection))
    }
}

impl Store for MemoryStore {
    type Transaction = MemoryTransaction;

    fn begin<'a>(&'a self, collections: &'a [Uuid]) -> BoxFuture<'a, DbResult<MemoryTransaction>> {
        async move {
            let mut ids = collections.to_vec();
            ids.sort_unstable();
            ids.dedup();

            let mut locked = Vec::with_capacity(ids.len());
            let mut working = HashMap::with_capacity(ids.len());
            for id in ids {
                let guard = self.collection(id).await.lock_owned().await;
                working.insert(id, (*guard).clone());
                locked.push((id, guard));
            }

            Ok(MemoryTransaction { locked, working })
        }
        .boxed()
    }

    fn snapshot(&self, collection: Uuid) -> BoxFuture<'_, DbResult<CollectionSnapshot>> {
        async move {
            let shared = self.collections.read().await.get(&collection).cloned();
            let Some(shared) = shared else {
                return Ok(CollectionSnapshot::default());
            };
            let state = shared.lock().await;
            Ok(CollectionSnapshot {
                version: state.version,
                resources: state.resources.values().cloned().collect(),
                tombstones: state.tombstones.clone(),
            })
        }
        .boxed()
    }

    fn purge_tombstones(&self, older_than: DateTime<Utc>) -> BoxFuture<'_, DbResult<usize>> {
        async move {
            let all: Vec<SharedCollection> =
                self.collections.read().await.values().cloned().collect();
            let mut purged = 0;
            for shared in all {
                let mut state = shared.lock().await;
                let before = state.tombstones.len();
                state.tombstones.retain(|t| t.deleted_at >= older_than);
                purged += before - state.tombstones.len();
            }
            Ok(purged)
        }
        .boxed()
    }
}

impl StoreTransaction for MemoryTransaction {
    fn load_resource<'a>(
        &'a mut self,
        collection: Uuid,
        resource_type: ResourceType,
        uid: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<ResourceRow>>> {
        let result = self
            .state(collection)
            .map(|s| s.resources.get(&(resource_type, uid.to_string())).cloned());
        ready(result).boxed()
    }

    fn load_resources(&mut self, collection: Uuid) -> BoxFuture<'_, DbResult<Vec<ResourceRow>>> {
        let result = self
            .state(collection)
            .map(|s| s.resources.values().cloned().collect());
        ready(result).boxed()
    }

    fn upsert_resource(&mut self, row: ResourceRow) -> BoxFuture<'_, DbResult<()>> {
        let result = self.state(row.collection_id).map(|s| {
            s.resources
                .insert((row.resource_type, row.uid.clone()), row);
        });
        ready(result).boxed()
    }

    fn delete_resource<'a>(
        &'a mut self,
        collection: Uuid,
        resource_type: ResourceType,
        uid: &'a str,
    ) -> BoxFuture<'a, DbResult<Option<ResourceRow>>> {
        let result = self
            .state(collection)
            .map(|s| s.resources.remove(&(resource_type, uid.to_string())));
        ready(result).boxed()
    }

    fn record_tombstone(&mut self, tombstone: Tombstone) -> BoxFuture<'_, DbResult<()>> {
        let result = self
            .state(tombstone.collection_id)
            .map(|s| s.tombstones.push(tombstone));
        ready(result).boxed()
    }

    fn ensure_collection(
        &mut self,
        collection: Uuid,
    ) -> BoxFuture<'_, DbResult<CollectionVersion>> {
        let result = self
            .state(collection)
            .map(|s| *s.version.get_or_insert_with(|| CollectionVersion::initial(Utc::now())));
        ready(result).boxed()
    }

    fn increment_ctag(&mut self, collection: Uuid) -> BoxFuture<'_, DbResult<CollectionVersion>> {
        let result = self.state(collection).map(|s| {
            let now = Utc::now();
            let next = s.version.unwrap_or_else(|| CollectionVersion::initial(now)).next(now);
            s.version = Some(next);
            next
        });
        ready(result).boxed()
    }

    fn commit(mut self) -> BoxFuture<'static, DbResult<()>> {
        for (id, guard) in &mut self.locked {
            if let Some(state) = self.working.remove(id) {
                **guard = state;
            }
        }
        // Guards drop together here, after every collection is updated.
        drop(self);
        ready(Ok(())).boxed()
    }
}
