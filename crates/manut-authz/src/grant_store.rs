//! Grant store: grant, revoke and read-time effectiveness of user
//! permissions.
//!
//! One record exists per (user, permission) pair. Writes go through the
//! repository's version check, so a racing writer surfaces as
//! `ConcurrentModification` instead of clobbering the other's state.
//! Expiry is never written back; it is evaluated on every read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use manut_core::error::{ManutError, ManutResult};
use manut_core::models::UserId;
use manut_core::models::audit::{AuditAction, AuditOutcome, CreateAuditLogEntry};
use manut_core::models::grant::{
    CreateGrant, Grant, GrantState, GrantStatus, UserGrant, effective_status,
};
use manut_core::models::permission::{Permission, PermissionFilter};
use manut_core::repository::{AuditLogRepository, GrantRepository, PermissionRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit;
use crate::catalog::PermissionCatalog;
use crate::config::AuthzConfig;

#[derive(Clone)]
pub struct GrantStore<P: PermissionRepository, G: GrantRepository, A: AuditLogRepository> {
    catalog: PermissionCatalog<P>,
    grants: G,
    audit: A,
    config: AuthzConfig,
}

impl<P, G, A> GrantStore<P, G, A>
where
    P: PermissionRepository,
    G: GrantRepository,
    A: AuditLogRepository,
{
    pub fn new(catalog: PermissionCatalog<P>, grants: G, audit: A, config: AuthzConfig) -> Self {
        Self {
            catalog,
            grants,
            audit,
            config,
        }
    }

    pub fn catalog(&self) -> &PermissionCatalog<P> {
        &self.catalog
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    pub(crate) fn audit(&self) -> &A {
        &self.audit
    }

    /// Grant `permission_name` to `user_id`.
    ///
    /// A revoked record is reactivated in place; an effective one is
    /// re-affirmed with the new grantor and timestamp.
    pub async fn grant(
        &self,
        user_id: UserId,
        permission_name: &str,
        granted_by: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> ManutResult<Grant> {
        let permission = match self.catalog.lookup(permission_name).await? {
            Some(permission) if permission.active => permission,
            _ => {
                return Err(ManutError::PermissionNotFound {
                    name: permission_name.into(),
                });
            }
        };

        if user_id == granted_by && !self.config.permits_self_grant(&permission.module) {
            warn!(user_id, permission = %permission.name, "self-grant refused");
            return Err(ManutError::SelfGrantNotPermitted {
                user_id,
                permission: permission.name,
            });
        }

        let now = Utc::now();
        let (grant, reactivated) = match self.grants.find(user_id, permission.id).await? {
            Some(existing) => {
                let reactivated = existing.is_revoked();
                let state = GrantState::granted(granted_by, now, expires_at);
                let grant = self
                    .grants
                    .update(existing.id, existing.version, state)
                    .await?;
                (grant, reactivated)
            }
            None => {
                let grant = self
                    .grants
                    .insert(CreateGrant {
                        user_id,
                        permission_id: permission.id,
                        granted_by,
                        granted_at: now,
                        expires_at,
                    })
                    .await?;
                (grant, false)
            }
        };

        info!(
            user_id,
            permission = %permission.name,
            granted_by,
            reactivated,
            "permission granted"
        );
        audit::record(
            &self.audit,
            CreateAuditLogEntry {
                actor_id: granted_by,
                target_user_id: Some(user_id),
                action: AuditAction::PermissionGranted,
                subject: permission.name,
                outcome: AuditOutcome::Success,
                metadata: Some(serde_json::json!({
                    "expires_at": expires_at,
                    "reactivated": reactivated,
                })),
                timestamp: now,
            },
        )
        .await;

        Ok(grant)
    }

    /// Revoke `permission_name` from `user_id`. Revoking an already
    /// revoked grant is a no-op.
    pub async fn revoke(
        &self,
        user_id: UserId,
        permission_name: &str,
        revoked_by: UserId,
    ) -> ManutResult<()> {
        let permission = self.catalog.find(permission_name).await?;
        let existing = self
            .grants
            .find(user_id, permission.id)
            .await?
            .ok_or_else(|| ManutError::GrantNotFound {
                user_id,
                permission: permission.name.clone(),
            })?;

        if existing.is_revoked() {
            debug!(user_id, permission = %permission.name, "grant already revoked");
            return Ok(());
        }

        let now = Utc::now();
        self.grants
            .update(existing.id, existing.version, existing.revoked(revoked_by, now))
            .await?;

        info!(user_id, permission = %permission.name, revoked_by, "permission revoked");
        audit::record(
            &self.audit,
            CreateAuditLogEntry {
                actor_id: revoked_by,
                target_user_id: Some(user_id),
                action: AuditAction::PermissionRevoked,
                subject: permission.name,
                outcome: AuditOutcome::Success,
                metadata: None,
                timestamp: now,
            },
        )
        .await;

        Ok(())
    }

    /// Which case applies to the pair at `now`, including the permission's
    /// own active flag.
    pub async fn status(
        &self,
        user_id: UserId,
        permission: &Permission,
        now: DateTime<Utc>,
    ) -> ManutResult<GrantStatus> {
        let grant = self.grants.find(user_id, permission.id).await?;
        Ok(effective_status(permission, grant.as_ref(), now))
    }

    /// Unknown and inactive permissions are never effective.
    pub async fn is_effective(
        &self,
        user_id: UserId,
        permission_name: &str,
        now: DateTime<Utc>,
    ) -> ManutResult<bool> {
        let Some(permission) = self.catalog.lookup(permission_name).await? else {
            return Ok(false);
        };
        let status = self.status(user_id, &permission, now).await?;
        Ok(status == GrantStatus::Effective)
    }

    /// Permissions currently effective for the user, ordered by name.
    pub async fn list_effective(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> ManutResult<Vec<Permission>> {
        let grants = self.grants.list_by_user(user_id).await?;
        let mut active = self
            .permissions_by_id(PermissionFilter {
                module: None,
                active: Some(true),
            })
            .await?;

        let mut permissions: Vec<Permission> = grants
            .iter()
            .filter(|grant| grant.is_effective(now))
            .filter_map(|grant| active.remove(&grant.permission_id))
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    /// Every grant record of the user, in any state, with its permission
    /// and computed status. Ordered by permission name.
    pub async fn list_user_grants(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> ManutResult<Vec<UserGrant>> {
        let grants = self.grants.list_by_user(user_id).await?;
        let permissions = self.permissions_by_id(PermissionFilter::default()).await?;

        let mut views = Vec::with_capacity(grants.len());
        for grant in grants {
            let Some(permission) = permissions.get(&grant.permission_id) else {
                warn!(grant_id = %grant.id, permission_id = %grant.permission_id, "grant references unknown permission");
                continue;
            };
            let status = effective_status(permission, Some(&grant), now);
            views.push(UserGrant {
                permission: permission.clone(),
                grant,
                status,
            });
        }
        views.sort_by(|a, b| a.permission.name.cmp(&b.permission.name));
        Ok(views)
    }

    async fn permissions_by_id(
        &self,
        filter: PermissionFilter,
    ) -> ManutResult<HashMap<Uuid, Permission>> {
        let permissions = self.catalog.list(filter).await?;
        Ok(permissions.into_iter().map(|p| (p.id, p)).collect())
    }
}
