//! Per-request authorization inputs and the decision produced for them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UserId;
use super::role::Role;
use crate::error::ManutResult;

/// Verified caller identity supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Builds an identity from a raw role claim.
    pub fn from_claim(user_id: UserId, role: &str) -> ManutResult<Self> {
        Ok(Self {
            user_id,
            role: role.parse()?,
        })
    }
}

/// What an action requires. Either part may be absent; an empty
/// requirement is satisfied by any identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub required_role: Option<Role>,
    pub permission_name: Option<String>,
}

impl Requirement {
    pub fn role(role: Role) -> Self {
        Self {
            required_role: Some(role),
            permission_name: None,
        }
    }

    pub fn permission(name: impl Into<String>) -> Self {
        Self {
            required_role: None,
            permission_name: Some(name.into()),
        }
    }

    pub fn and_permission(mut self, name: impl Into<String>) -> Self {
        self.permission_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    RoleSufficient,
    PermissionGranted,
    RoleInsufficient,
    PermissionMissing,
    PermissionExpired,
    PermissionInactive,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::RoleSufficient => "ROLE_SUFFICIENT",
            DecisionReason::PermissionGranted => "PERMISSION_GRANTED",
            DecisionReason::RoleInsufficient => "ROLE_INSUFFICIENT",
            DecisionReason::PermissionMissing => "PERMISSION_MISSING",
            DecisionReason::PermissionExpired => "PERMISSION_EXPIRED",
            DecisionReason::PermissionInactive => "PERMISSION_INACTIVE",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one evaluation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AuthorizationDecision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManutError;

    #[test]
    fn identity_from_claim_rejects_unknown_role() {
        let err = Identity::from_claim(42, "root").unwrap_err();
        assert!(matches!(err, ManutError::UnknownRole { .. }));

        let identity = Identity::from_claim(42, "tecnico").unwrap();
        assert_eq!(identity.role, Role::Tecnico);
    }

    #[test]
    fn requirement_builders() {
        let req = Requirement::role(Role::Supervisor).and_permission("users.permissions");
        assert_eq!(req.required_role, Some(Role::Supervisor));
        assert_eq!(req.permission_name.as_deref(), Some("users.permissions"));
        assert_eq!(Requirement::default().required_role, None);
    }

    #[test]
    fn reasons_serialize_as_screaming_snake_case() {
        let decision = AuthorizationDecision::deny(DecisionReason::PermissionExpired);
        let json = serde_json::to_value(decision).unwrap();
        assert_eq!(json["allowed"], false);
        assert_eq!(json["reason"], "PERMISSION_EXPIRED");
        assert_eq!(DecisionReason::RoleSufficient.to_string(), "ROLE_SUFFICIENT");
    }
}
