//! Error types for the authorization core.

use thiserror::Error;

use crate::models::UserId;

#[derive(Debug, Error)]
pub enum ManutError {
    #[error("Unknown role: {role}")]
    UnknownRole { role: String },

    #[error("Permission already registered with different fields: {name}")]
    DuplicatePermission { name: String },

    #[error("Permission not found or inactive: {name}")]
    PermissionNotFound { name: String },

    #[error("No grant of {permission} exists for user {user_id}")]
    GrantNotFound { user_id: UserId, permission: String },

    #[error("User {user_id} may not grant {permission} to themselves")]
    SelfGrantNotPermitted { user_id: UserId, permission: String },

    #[error("Concurrent modification of {entity} {id}")]
    ConcurrentModification { entity: String, id: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManutError {
    /// Whether the caller may retry the operation once with fresh data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ManutError::ConcurrentModification { .. })
    }
}

pub type ManutResult<T> = Result<T, ManutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_concurrent_modification_is_retryable() {
        let conflict = ManutError::ConcurrentModification {
            entity: "user_permission".into(),
            id: "x".into(),
        };
        assert!(conflict.is_retryable());

        let not_found = ManutError::GrantNotFound {
            user_id: 42,
            permission: "reports.export".into(),
        };
        assert!(!not_found.is_retryable());
        assert!(!ManutError::Database("boom".into()).is_retryable());
    }
}
