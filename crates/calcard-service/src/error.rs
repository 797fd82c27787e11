use calcard_db::error::DbError;
use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(DbError),

    #[error(transparent)]
    RfcError(#[from] calcard_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] calcard_core::error::CoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A conditional request lost against the stored version.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<DbError> for ServiceError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::Conflict(message) => Self::Conflict(message),
            DbError::NotFound { collection_id, uid } => {
                Self::NotFound(format!("resource '{uid}' in collection {collection_id}"))
            }
            other => Self::DatabaseError(other),
        }
    }
}

impl ServiceError {
    /// Whether this maps to a failed precondition (HTTP 412).
    #[must_use]
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn conflict_is_a_precondition_failure() {
        let err = ServiceError::from(DbError::Conflict("stale".to_string()));
        assert!(err.is_precondition_failure());
        assert!(!err.is_not_found());
    }

    #[test]
    fn missing_row_is_not_found() {
        let err = ServiceError::from(DbError::NotFound {
            collection_id: Uuid::nil(),
            uid: "evt1".to_string(),
        });
        assert!(err.is_not_found());
        assert!(err.to_string().contains("evt1"));
    }

    #[test]
    fn other_db_errors_pass_through() {
        let err = ServiceError::from(DbError::NotLocked(Uuid::nil()));
        assert!(matches!(err, ServiceError::DatabaseError(DbError::NotLocked(_))));
        assert!(!err.is_precondition_failure());
    }
}
