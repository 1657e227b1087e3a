//! Database-specific error types and conversions.

use manut_core::error::ManutError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Cannot reach {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Write conflict on {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Invalid stored value: {0}")]
    Decode(String),
}

/// Statement errors that mean another writer got there first. Unique
/// index violations and the store's own optimistic transaction conflicts
/// both qualify; either can be retried with fresh reads.
const CONFLICT_MARKERS: &[&str] = &[
    "already contains",
    "already exists",
    "Transaction conflict",
    "can be retried",
];

fn is_conflict(message: &str) -> bool {
    CONFLICT_MARKERS.iter().any(|marker| message.contains(marker))
}

impl DbError {
    /// Classify a failed statement: write conflicts become
    /// [`DbError::Conflict`], anything else [`DbError::Query`].
    pub(crate) fn from_statement(entity: &str, id: &str, err: impl std::fmt::Display) -> Self {
        let message = err.to_string();
        if is_conflict(&message) {
            DbError::Conflict {
                entity: entity.into(),
                id: id.into(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for ManutError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict { entity, id } => ManutError::ConcurrentModification { entity, id },
            // A conflict detected at commit time arrives as a client error
            // rather than a statement error.
            DbError::Surreal(e) if is_conflict(&e.to_string()) => {
                ManutError::ConcurrentModification {
                    entity: "transaction".into(),
                    id: e.to_string(),
                }
            }
            other => ManutError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_concurrent_modification() {
        let err = DbError::from_statement(
            "user_permission",
            "42",
            "Database index `idx_user_permission_pair` already contains [42, 'abc']",
        );
        let err: ManutError = err.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn transaction_conflict_maps_to_concurrent_modification() {
        let err = DbError::from_statement(
            "user_permission",
            "42:abc",
            "There was a problem with the key-value store: Transaction conflict: \
             Write conflict, retry the transaction. This transaction can be retried",
        );
        assert!(matches!(err, DbError::Conflict { .. }));
        let err: ManutError = err.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn other_statement_errors_are_not_retryable() {
        let err = DbError::from_statement("permission", "x", "Found NONE for field `module`");
        assert!(matches!(err, DbError::Query(_)));
        let err: ManutError = err.into();
        assert!(matches!(err, ManutError::Database(_)));
    }
}
