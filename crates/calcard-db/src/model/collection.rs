use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ResourceRow, Tombstone};

/// Version counter of one calendar or address book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionVersion {
    /// Incremented once per resource mutation in the collection.
    pub ctag: i64,
    pub updated_at: DateTime<Utc>,
}

impl CollectionVersion {
    #[must_use]
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            ctag: 0,
            updated_at: now,
        }
    }

    /// The version after one more mutation.
    #[must_use]
    pub fn next(self, now: DateTime<Utc>) -> Self {
        Self {
            ctag: self.ctag + 1,
            updated_at: now,
        }
    }
}

/// A committed, consistent view of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionSnapshot {
    /// `None` for a collection never written to.
    pub version: Option<CollectionVersion>,
    pub resources: Vec<ResourceRow>,
    pub tombstones: Vec<Tombstone>,
}

impl CollectionSnapshot {
    /// Current ctag, 0 for an unknown collection.
    #[must_use]
    pub fn ctag(&self) -> i64 {
        self.version.map_or(0, |v| v.ctag)
    }
}
