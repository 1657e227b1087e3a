//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The authorization services are
//! generic over these traits so they carry no dependency on a concrete
//! database crate.

use uuid::Uuid;

use crate::error::ManutResult;
use crate::models::UserId;
use crate::models::{
    audit::{AuditAction, AuditLogEntry, CreateAuditLogEntry},
    grant::{CreateGrant, Grant, GrantState},
    permission::{CreatePermission, Permission, PermissionFilter},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Permission catalog
// ---------------------------------------------------------------------------

pub trait PermissionRepository: Send + Sync {
    /// Insert a new permission. Unique-index violations on `name` or
    /// `(module, action, resource)` surface as errors.
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = ManutResult<Permission>> + Send;
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = ManutResult<Option<Permission>>> + Send;
    fn find_by_id(&self, id: Uuid) -> impl Future<Output = ManutResult<Option<Permission>>> + Send;
    fn find_by_key(
        &self,
        module: &str,
        action: &str,
        resource: Option<&str>,
    ) -> impl Future<Output = ManutResult<Option<Permission>>> + Send;
    /// Toggle the `active` flag. Returns `None` when no permission has
    /// that name.
    fn set_active(
        &self,
        name: &str,
        active: bool,
    ) -> impl Future<Output = ManutResult<Option<Permission>>> + Send;
    fn list(
        &self,
        filter: PermissionFilter,
    ) -> impl Future<Output = ManutResult<Vec<Permission>>> + Send;
}

// ---------------------------------------------------------------------------
// Grants (user permissions)
// ---------------------------------------------------------------------------

pub trait GrantRepository: Send + Sync {
    fn find(
        &self,
        user_id: UserId,
        permission_id: Uuid,
    ) -> impl Future<Output = ManutResult<Option<Grant>>> + Send;
    /// Insert the first record for a pair. Losing a race against another
    /// insert for the same pair yields `ConcurrentModification`.
    fn insert(&self, input: CreateGrant) -> impl Future<Output = ManutResult<Grant>> + Send;
    /// Overwrite a record's state if its version still equals
    /// `expected_version`; otherwise `ConcurrentModification`.
    fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        state: GrantState,
    ) -> impl Future<Output = ManutResult<Grant>> + Send;
    /// Every record for a user, in any state.
    fn list_by_user(&self, user_id: UserId) -> impl Future<Output = ManutResult<Vec<Grant>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<UserId>,
    pub target_user_id: Option<UserId>,
    pub action: Option<AuditAction>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = ManutResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = ManutResult<PaginatedResult<AuditLogEntry>>> + Send;
}
