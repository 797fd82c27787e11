use thiserror::Error;
use uuid::Uuid;

/// Persistence and versioning errors
#[derive(Error, Debug)]
pub enum DbError {
    /// A precondition failed or a concurrent writer got there first.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: collection_id={collection_id}, uid={uid}")]
    NotFound { collection_id: Uuid, uid: String },

    #[error("Collection {0} is not locked by this transaction")]
    NotLocked(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl DbError {
    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;
