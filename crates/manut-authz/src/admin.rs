//! Administrative surface over the catalog and grant store.
//!
//! Every operation is gated by the same evaluator request handlers use:
//! reads need `supervisor` plus `users.permissions`, writes need
//! `administrador` plus `users.permissions`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use manut_core::error::{ManutError, ManutResult};
use manut_core::models::UserId;
use manut_core::models::audit::{AuditAction, AuditOutcome, CreateAuditLogEntry};
use manut_core::models::authorization::{Identity, Requirement};
use manut_core::models::grant::{Grant, UserGrant};
use manut_core::models::permission::{CreatePermission, Permission, PermissionFilter};
use manut_core::models::role::Role;
use manut_core::repository::{AuditLogRepository, GrantRepository, PermissionRepository};
use tracing::{info, warn};

use crate::audit;
use crate::evaluator::AuthorizationEvaluator;
use crate::grant_store::GrantStore;

/// Permission that gates permission administration.
pub const MANAGE_PERMISSIONS: &str = "users.permissions";

pub fn read_requirement() -> Requirement {
    Requirement::role(Role::Supervisor).and_permission(MANAGE_PERMISSIONS)
}

pub fn write_requirement() -> Requirement {
    Requirement::role(Role::Administrador).and_permission(MANAGE_PERMISSIONS)
}

#[derive(Clone)]
pub struct PermissionAdmin<P: PermissionRepository, G: GrantRepository, A: AuditLogRepository> {
    evaluator: AuthorizationEvaluator<P, G, A>,
}

impl<P, G, A> PermissionAdmin<P, G, A>
where
    P: PermissionRepository,
    G: GrantRepository,
    A: AuditLogRepository,
{
    pub fn new(evaluator: AuthorizationEvaluator<P, G, A>) -> Self {
        Self { evaluator }
    }

    fn store(&self) -> &GrantStore<P, G, A> {
        self.evaluator.store()
    }

    async fn ensure(&self, actor: &Identity, requirement: Requirement) -> ManutResult<()> {
        let decision = self
            .evaluator
            .authorize(actor, &requirement, Utc::now())
            .await?;
        if decision.allowed {
            Ok(())
        } else {
            Err(ManutError::AuthorizationDenied {
                reason: decision.reason.to_string(),
            })
        }
    }

    pub async fn register_permission(
        &self,
        actor: &Identity,
        input: CreatePermission,
    ) -> ManutResult<Permission> {
        self.ensure(actor, write_requirement()).await?;
        let permission = self.store().catalog().register(input).await?;
        audit::record(
            self.store().audit(),
            CreateAuditLogEntry {
                actor_id: actor.user_id,
                target_user_id: None,
                action: AuditAction::PermissionRegistered,
                subject: permission.name.clone(),
                outcome: AuditOutcome::Success,
                metadata: Some(serde_json::json!({
                    "module": permission.module,
                    "action": permission.action,
                    "resource": permission.resource,
                })),
                timestamp: Utc::now(),
            },
        )
        .await;
        Ok(permission)
    }

    pub async fn set_permission_active(
        &self,
        actor: &Identity,
        name: &str,
        active: bool,
    ) -> ManutResult<Permission> {
        self.ensure(actor, write_requirement()).await?;
        let permission = self.store().catalog().set_active(name, active).await?;
        let action = if active {
            AuditAction::PermissionActivated
        } else {
            AuditAction::PermissionDeactivated
        };
        audit::record(
            self.store().audit(),
            CreateAuditLogEntry {
                actor_id: actor.user_id,
                target_user_id: None,
                action,
                subject: permission.name.clone(),
                outcome: AuditOutcome::Success,
                metadata: None,
                timestamp: Utc::now(),
            },
        )
        .await;
        Ok(permission)
    }

    pub async fn list_permissions(
        &self,
        actor: &Identity,
        filter: PermissionFilter,
    ) -> ManutResult<Vec<Permission>> {
        self.ensure(actor, read_requirement()).await?;
        self.store().catalog().list(filter).await
    }

    pub async fn list_modules(&self, actor: &Identity) -> ManutResult<Vec<String>> {
        self.ensure(actor, read_requirement()).await?;
        self.store().catalog().list_modules().await
    }

    pub async fn user_grants(
        &self,
        actor: &Identity,
        user_id: UserId,
    ) -> ManutResult<Vec<UserGrant>> {
        self.ensure(actor, read_requirement()).await?;
        self.store().list_user_grants(user_id, Utc::now()).await
    }

    pub async fn grant(
        &self,
        actor: &Identity,
        user_id: UserId,
        permission_name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> ManutResult<Grant> {
        self.ensure(actor, write_requirement()).await?;
        self.grant_unchecked(actor.user_id, user_id, permission_name, expires_at)
            .await
    }

    pub async fn revoke(
        &self,
        actor: &Identity,
        user_id: UserId,
        permission_name: &str,
    ) -> ManutResult<()> {
        self.ensure(actor, write_requirement()).await?;
        self.revoke_unchecked(actor.user_id, user_id, permission_name)
            .await
    }

    /// Make the user's set of active grants equal `names`.
    ///
    /// Every name is checked against the catalog and the self-grant
    /// policy before anything is written. Returns the resulting effective
    /// permissions.
    pub async fn replace_user_permissions(
        &self,
        actor: &Identity,
        user_id: UserId,
        names: &[String],
    ) -> ManutResult<Vec<Permission>> {
        self.ensure(actor, write_requirement()).await?;

        let desired: BTreeSet<&str> = names.iter().map(|n| n.trim()).collect();
        for name in &desired {
            let permission = match self.store().catalog().lookup(name).await? {
                Some(permission) if permission.active => permission,
                _ => {
                    return Err(ManutError::PermissionNotFound {
                        name: (*name).to_string(),
                    });
                }
            };
            if user_id == actor.user_id
                && !self.store().config().permits_self_grant(&permission.module)
            {
                return Err(ManutError::SelfGrantNotPermitted {
                    user_id,
                    permission: permission.name,
                });
            }
        }

        let current = self.store().list_user_grants(user_id, Utc::now()).await?;
        let mut revoked = 0usize;
        for view in &current {
            if view.grant.is_revoked() || desired.contains(view.permission.name.as_str()) {
                continue;
            }
            self.revoke_unchecked(actor.user_id, user_id, &view.permission.name)
                .await?;
            revoked += 1;
        }
        for name in &desired {
            self.grant_unchecked(actor.user_id, user_id, name, None)
                .await?;
        }

        info!(
            user_id,
            actor = actor.user_id,
            granted = desired.len(),
            revoked,
            "user permissions replaced"
        );
        self.store().list_effective(user_id, Utc::now()).await
    }

    async fn grant_unchecked(
        &self,
        actor_id: UserId,
        user_id: UserId,
        permission_name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> ManutResult<Grant> {
        let store = self.store();
        retry_once(move || store.grant(user_id, permission_name, actor_id, expires_at)).await
    }

    async fn revoke_unchecked(
        &self,
        actor_id: UserId,
        user_id: UserId,
        permission_name: &str,
    ) -> ManutResult<()> {
        let store = self.store();
        retry_once(move || store.revoke(user_id, permission_name, actor_id)).await
    }
}

/// Run `op`, and run it once more with fresh reads if the first attempt
/// lost an optimistic-concurrency race.
pub async fn retry_once<T, F, Fut>(mut op: F) -> ManutResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ManutResult<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => {
            warn!(error = %e, "concurrent modification, retrying once");
            op().await
        }
        other => other,
    }
}
