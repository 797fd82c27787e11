use calcard_core::types::ResourceType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Record of a deleted resource, kept until the retention purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tombstone {
    pub resource_type: ResourceType,
    pub collection_id: Uuid,
    pub uid: String,
    pub resource_name: String,
    pub deleted_at: DateTime<Utc>,
    /// Collection ctag the deletion was recorded at.
    pub revision: i64,
}
