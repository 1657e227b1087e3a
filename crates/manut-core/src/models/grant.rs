//! Grant (user permission) domain model.
//!
//! At most one grant record exists per (user, permission) pair. The
//! record is overwritten on every grant/revoke cycle and never deleted;
//! effectiveness is computed at read time, never pushed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;
use super::permission::Permission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: Uuid,
    pub user_id: UserId,
    pub permission_id: Uuid,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
    pub revoked_by: Option<UserId>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    /// Optimistic-concurrency version, bumped on every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of checking one (user, permission) pair at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantStatus {
    Effective,
    /// No grant record exists for the pair.
    Missing,
    /// A record exists but was revoked or deactivated.
    Revoked,
    /// A record exists, is not revoked, but `expires_at` has passed.
    Expired,
    /// The permission itself is inactive in the catalog.
    PermissionInactive,
}

impl Grant {
    pub fn is_revoked(&self) -> bool {
        !self.active || self.revoked_at.is_some()
    }

    /// Status of the record alone, ignoring the permission's own flag.
    pub fn status(&self, now: DateTime<Utc>) -> GrantStatus {
        if self.is_revoked() {
            return GrantStatus::Revoked;
        }
        match self.expires_at {
            Some(expires_at) if expires_at <= now => GrantStatus::Expired,
            _ => GrantStatus::Effective,
        }
    }

    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == GrantStatus::Effective
    }

    /// The state written when this record is revoked. Grant provenance
    /// and expiry are kept for the audit trail.
    pub fn revoked(&self, revoked_by: UserId, revoked_at: DateTime<Utc>) -> GrantState {
        GrantState {
            active: false,
            granted_by: self.granted_by,
            granted_at: self.granted_at,
            revoked_by: Some(revoked_by),
            revoked_at: Some(revoked_at),
            expires_at: self.expires_at,
        }
    }
}

/// Combines the record status with the permission's active flag.
pub fn effective_status(
    permission: &Permission,
    grant: Option<&Grant>,
    now: DateTime<Utc>,
) -> GrantStatus {
    if !permission.active {
        return GrantStatus::PermissionInactive;
    }
    match grant {
        Some(grant) => grant.status(now),
        None => GrantStatus::Missing,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGrant {
    pub user_id: UserId,
    pub permission_id: Uuid,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Full mutable state of a grant record, written under a version check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantState {
    pub active: bool,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
    pub revoked_by: Option<UserId>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl GrantState {
    /// The state written when a record is (re)granted: revocation is
    /// cleared and provenance overwritten.
    pub fn granted(
        granted_by: UserId,
        granted_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            active: true,
            granted_by,
            granted_at,
            revoked_by: None,
            revoked_at: None,
            expires_at,
        }
    }
}

/// A grant joined with its permission and computed status, for
/// administrative listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGrant {
    pub permission: Permission,
    pub grant: Grant,
    pub status: GrantStatus,
}
