//! Authorization evaluator: the single decision point for request
//! handlers.
//!
//! Role and permission are independent axes. The role gate is checked
//! first and short-circuits; the highest role is not a bypass for
//! explicit permission requirements.

use chrono::{DateTime, Utc};
use manut_core::error::ManutResult;
use manut_core::models::audit::{AuditAction, AuditOutcome, CreateAuditLogEntry};
use manut_core::models::authorization::{
    AuthorizationDecision, DecisionReason, Identity, Requirement,
};
use manut_core::models::grant::GrantStatus;
use manut_core::repository::{AuditLogRepository, GrantRepository, PermissionRepository};
use tracing::debug;

use crate::audit;
use crate::grant_store::GrantStore;

#[derive(Clone)]
pub struct AuthorizationEvaluator<P: PermissionRepository, G: GrantRepository, A: AuditLogRepository>
{
    store: GrantStore<P, G, A>,
}

impl<P, G, A> AuthorizationEvaluator<P, G, A>
where
    P: PermissionRepository,
    G: GrantRepository,
    A: AuditLogRepository,
{
    pub fn new(store: GrantStore<P, G, A>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &GrantStore<P, G, A> {
        &self.store
    }

    /// Decide whether `identity` meets `requirement` at `now`.
    ///
    /// Denials are returned as decisions, never as errors; `Err` means
    /// the backing store failed.
    pub async fn authorize(
        &self,
        identity: &Identity,
        requirement: &Requirement,
        now: DateTime<Utc>,
    ) -> ManutResult<AuthorizationDecision> {
        let decision = self.decide(identity, requirement, now).await?;

        if !decision.allowed {
            debug!(
                user_id = identity.user_id,
                role = identity.role.as_str(),
                reason = decision.reason.as_str(),
                "authorization denied"
            );
            if self.store.config().audit_denials {
                self.record_denial(identity, requirement, decision.reason, now)
                    .await;
            }
        }

        Ok(decision)
    }

    async fn decide(
        &self,
        identity: &Identity,
        requirement: &Requirement,
        now: DateTime<Utc>,
    ) -> ManutResult<AuthorizationDecision> {
        if let Some(required) = requirement.required_role
            && !identity.role.satisfies(required)
        {
            return Ok(AuthorizationDecision::deny(DecisionReason::RoleInsufficient));
        }

        let Some(name) = requirement.permission_name.as_deref() else {
            return Ok(AuthorizationDecision::allow(DecisionReason::RoleSufficient));
        };

        let permission = match self.store.catalog().lookup(name).await? {
            Some(permission) if permission.active => permission,
            _ => {
                return Ok(AuthorizationDecision::deny(
                    DecisionReason::PermissionInactive,
                ));
            }
        };

        let status = self.store.status(identity.user_id, &permission, now).await?;
        Ok(decision_for(status))
    }

    /// Names of the permissions currently effective for `identity`,
    /// sorted.
    pub async fn capabilities(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> ManutResult<Vec<String>> {
        let permissions = self.store.list_effective(identity.user_id, now).await?;
        Ok(permissions.into_iter().map(|p| p.name).collect())
    }

    async fn record_denial(
        &self,
        identity: &Identity,
        requirement: &Requirement,
        reason: DecisionReason,
        now: DateTime<Utc>,
    ) {
        let subject = match (&requirement.permission_name, requirement.required_role) {
            (Some(name), _) => name.clone(),
            (None, Some(role)) => role.as_str().to_string(),
            (None, None) => String::new(),
        };
        audit::record(
            self.store.audit(),
            CreateAuditLogEntry {
                actor_id: identity.user_id,
                target_user_id: None,
                action: AuditAction::AuthorizationDenied,
                subject,
                outcome: AuditOutcome::Denied,
                metadata: Some(serde_json::json!({
                    "reason": reason,
                    "role": identity.role,
                    "required_role": requirement.required_role,
                    "permission": requirement.permission_name,
                })),
                timestamp: now,
            },
        )
        .await;
    }
}

/// Map a grant status onto a decision. A revoked grant reads as missing;
/// only an unrevoked grant past its expiry reads as expired.
pub fn decision_for(status: GrantStatus) -> AuthorizationDecision {
    match status {
        GrantStatus::Effective => AuthorizationDecision::allow(DecisionReason::PermissionGranted),
        GrantStatus::Missing | GrantStatus::Revoked => {
            AuthorizationDecision::deny(DecisionReason::PermissionMissing)
        }
        GrantStatus::Expired => AuthorizationDecision::deny(DecisionReason::PermissionExpired),
        GrantStatus::PermissionInactive => {
            AuthorizationDecision::deny(DecisionReason::PermissionInactive)
        }
    }
}
