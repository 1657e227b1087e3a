//! Startup provisioning: default catalog and bootstrap administrators.

use chrono::Utc;
use manut_authz::GrantStore;
use manut_authz::admin::MANAGE_PERMISSIONS;
use manut_core::error::ManutResult;
use manut_core::models::{SYSTEM_ACTOR, UserId};
use manut_core::repository::{AuditLogRepository, GrantRepository, PermissionRepository};
use tracing::{debug, info};

/// Seed the default catalog and make sure every configured administrator
/// holds `users.permissions`, granted by the system actor. Existing
/// effective grants are left alone so restarts do not re-affirm them.
pub async fn provision<P, G, A>(
    store: &GrantStore<P, G, A>,
    administrators: &[UserId],
) -> ManutResult<()>
where
    P: PermissionRepository,
    G: GrantRepository,
    A: AuditLogRepository,
{
    let created = store.catalog().seed_defaults().await?;
    info!(created, "permission catalog ready");

    for &user_id in administrators {
        if store
            .is_effective(user_id, MANAGE_PERMISSIONS, Utc::now())
            .await?
        {
            debug!(user_id, "bootstrap administrator already provisioned");
            continue;
        }
        store
            .grant(user_id, MANAGE_PERMISSIONS, SYSTEM_ACTOR, None)
            .await?;
        info!(user_id, "bootstrap administrator provisioned");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use manut_authz::{AuthzConfig, PermissionCatalog};
    use manut_core::repository::GrantRepository;
    use manut_db::repository::{
        SurrealAuditLogRepository, SurrealGrantRepository, SurrealPermissionRepository,
    };
    use surrealdb::Surreal;
    use surrealdb::engine::local::Mem;

    use super::*;

    #[tokio::test]
    async fn provisioning_is_repeatable() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        manut_db::run_migrations(&db).await.unwrap();

        let store = GrantStore::new(
            PermissionCatalog::new(SurrealPermissionRepository::new(db.clone())),
            SurrealGrantRepository::new(db.clone()),
            SurrealAuditLogRepository::new(db.clone()),
            AuthzConfig::default(),
        );

        provision(&store, &[1, 2]).await.unwrap();
        provision(&store, &[1, 2]).await.unwrap();

        for user_id in [1, 2] {
            assert!(
                store
                    .is_effective(user_id, MANAGE_PERMISSIONS, Utc::now())
                    .await
                    .unwrap()
            );
            let grants = SurrealGrantRepository::new(db.clone())
                .list_by_user(user_id)
                .await
                .unwrap();
            assert_eq!(grants.len(), 1);
            assert_eq!(grants[0].granted_by, SYSTEM_ACTOR);
            assert_eq!(grants[0].version, 1);
        }
    }
}
