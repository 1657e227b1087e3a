//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    PermissionRegistered,
    PermissionActivated,
    PermissionDeactivated,
    PermissionGranted,
    PermissionRevoked,
    AuthorizationDenied,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::PermissionRegistered => "PermissionRegistered",
            AuditAction::PermissionActivated => "PermissionActivated",
            AuditAction::PermissionDeactivated => "PermissionDeactivated",
            AuditAction::PermissionGranted => "PermissionGranted",
            AuditAction::PermissionRevoked => "PermissionRevoked",
            AuditAction::AuthorizationDenied => "AuthorizationDenied",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

impl AuditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditOutcome::Success => "Success",
            AuditOutcome::Failure => "Failure",
            AuditOutcome::Denied => "Denied",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: UserId,
    pub target_user_id: Option<UserId>,
    pub action: AuditAction,
    /// Permission name or role identifier the entry is about.
    pub subject: String,
    pub outcome: AuditOutcome,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    pub actor_id: UserId,
    pub target_user_id: Option<UserId>,
    pub action: AuditAction,
    pub subject: String,
    pub outcome: AuditOutcome,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}
