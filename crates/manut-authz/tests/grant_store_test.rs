//! Integration tests for the grant store using in-memory SurrealDB.

use chrono::{Duration, Utc};
use manut_authz::config::{AuthzConfig, SelfGrantPolicy};
use manut_authz::{GrantStore, PermissionCatalog};
use manut_core::error::{ManutError, ManutResult};
use manut_core::models::audit::{AuditAction, AuditLogEntry, CreateAuditLogEntry};
use manut_core::models::grant::GrantStatus;
use manut_core::models::permission::CreatePermission;
use manut_core::repository::{
    AuditLogFilter, AuditLogRepository, GrantRepository, PaginatedResult, Pagination,
};
use manut_db::repository::{
    SurrealAuditLogRepository, SurrealGrantRepository, SurrealPermissionRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Store =
    GrantStore<SurrealPermissionRepository<Db>, SurrealGrantRepository<Db>, SurrealAuditLogRepository<Db>>;

const ADMIN: i64 = 1;
const OTHER_ADMIN: i64 = 2;

async fn connect() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    manut_db::run_migrations(&db).await.unwrap();
    db
}

async fn register_defaults(catalog: &PermissionCatalog<SurrealPermissionRepository<Db>>) {
    for (name, module, action) in [
        ("reports.export", "reports", "export"),
        ("reports.view", "reports", "view"),
        ("users.permissions", "users", "permissions"),
    ] {
        catalog
            .register(CreatePermission::new(name, module, action))
            .await
            .unwrap();
    }
}

async fn setup_with(config: AuthzConfig) -> (Store, Surreal<Db>) {
    let db = connect().await;
    let catalog = PermissionCatalog::new(SurrealPermissionRepository::new(db.clone()));
    register_defaults(&catalog).await;
    let store = GrantStore::new(
        catalog,
        SurrealGrantRepository::new(db.clone()),
        SurrealAuditLogRepository::new(db.clone()),
        config,
    );
    (store, db)
}

async fn setup() -> (Store, Surreal<Db>) {
    setup_with(AuthzConfig::default()).await
}

#[tokio::test]
async fn grant_then_effective() {
    let (store, _db) = setup().await;

    let grant = store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    assert_eq!(grant.user_id, 42);
    assert_eq!(grant.granted_by, ADMIN);

    assert!(store.is_effective(42, "reports.export", Utc::now()).await.unwrap());
    assert!(!store.is_effective(43, "reports.export", Utc::now()).await.unwrap());
}

#[tokio::test]
async fn revoke_then_ineffective() {
    let (store, db) = setup().await;

    store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    store.revoke(42, "reports.export", OTHER_ADMIN).await.unwrap();

    assert!(!store.is_effective(42, "reports.export", Utc::now()).await.unwrap());

    let grants = SurrealGrantRepository::new(db).list_by_user(42).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert!(!grants[0].active);
    assert_eq!(grants[0].revoked_by, Some(OTHER_ADMIN));
    assert!(grants[0].revoked_at.is_some());
    assert_eq!(grants[0].granted_by, ADMIN);
}

#[tokio::test]
async fn revoke_twice_is_a_noop() {
    let (store, db) = setup().await;

    store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    store.revoke(42, "reports.export", ADMIN).await.unwrap();
    store.revoke(42, "reports.export", OTHER_ADMIN).await.unwrap();

    let grants = SurrealGrantRepository::new(db).list_by_user(42).await.unwrap();
    assert_eq!(grants[0].revoked_by, Some(ADMIN));
    assert_eq!(grants[0].version, 2);
}

#[tokio::test]
async fn revoke_errors_distinguish_unknown_permission_from_missing_grant() {
    let (store, _db) = setup().await;

    let err = store.revoke(42, "reports.nothing", ADMIN).await.unwrap_err();
    assert!(matches!(err, ManutError::PermissionNotFound { .. }));

    let err = store.revoke(42, "reports.export", ADMIN).await.unwrap_err();
    assert!(matches!(err, ManutError::GrantNotFound { user_id: 42, .. }));
}

#[tokio::test]
async fn grant_of_unknown_or_inactive_permission_fails() {
    let (store, _db) = setup().await;

    let err = store.grant(42, "reports.nothing", ADMIN, None).await.unwrap_err();
    assert!(matches!(err, ManutError::PermissionNotFound { .. }));

    store.catalog().set_active("reports.export", false).await.unwrap();
    let err = store.grant(42, "reports.export", ADMIN, None).await.unwrap_err();
    assert!(matches!(err, ManutError::PermissionNotFound { .. }));
}

#[tokio::test]
async fn idempotent_grant_keeps_one_record_and_reaffirms() {
    let (store, db) = setup().await;

    let first = store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    let second = store.grant(42, "reports.export", OTHER_ADMIN, None).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.granted_by, OTHER_ADMIN);
    assert!(second.granted_at >= first.granted_at);
    assert_eq!(second.version, first.version + 1);

    let grants = SurrealGrantRepository::new(db).list_by_user(42).await.unwrap();
    assert_eq!(grants.len(), 1);
}

#[tokio::test]
async fn regrant_after_revoke_reactivates_the_same_record() {
    let (store, _db) = setup().await;

    let first = store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    store.revoke(42, "reports.export", ADMIN).await.unwrap();
    let again = store.grant(42, "reports.export", OTHER_ADMIN, None).await.unwrap();

    assert_eq!(again.id, first.id);
    assert!(again.active);
    assert_eq!(again.revoked_by, None);
    assert_eq!(again.revoked_at, None);
    assert_eq!(again.granted_by, OTHER_ADMIN);
    assert!(store.is_effective(42, "reports.export", Utc::now()).await.unwrap());
}

#[tokio::test]
async fn expired_grant_is_not_effective_and_reports_expired() {
    let (store, _db) = setup().await;
    let now = Utc::now();

    store
        .grant(42, "reports.export", ADMIN, Some(now - Duration::seconds(1)))
        .await
        .unwrap();
    assert!(!store.is_effective(42, "reports.export", now).await.unwrap());

    let permission = store.catalog().find("reports.export").await.unwrap();
    assert_eq!(
        store.status(42, &permission, now).await.unwrap(),
        GrantStatus::Expired
    );
    assert_eq!(
        store.status(43, &permission, now).await.unwrap(),
        GrantStatus::Missing
    );
}

#[tokio::test]
async fn expiry_is_evaluated_at_read_time() {
    let (store, _db) = setup().await;
    let now = Utc::now();

    store
        .grant(42, "reports.export", ADMIN, Some(now + Duration::hours(1)))
        .await
        .unwrap();
    assert!(store.is_effective(42, "reports.export", now).await.unwrap());
    assert!(
        !store
            .is_effective(42, "reports.export", now + Duration::hours(2))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn inactive_permission_cannot_be_satisfied() {
    let (store, db) = setup().await;

    store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    store.catalog().set_active("reports.export", false).await.unwrap();
    assert!(!store.is_effective(42, "reports.export", Utc::now()).await.unwrap());

    // The grant row itself is untouched.
    let grants = SurrealGrantRepository::new(db).list_by_user(42).await.unwrap();
    assert!(grants[0].active);

    store.catalog().set_active("reports.export", true).await.unwrap();
    assert!(store.is_effective(42, "reports.export", Utc::now()).await.unwrap());
}

#[tokio::test]
async fn unknown_permission_is_never_effective() {
    let (store, _db) = setup().await;
    assert!(!store.is_effective(42, "reports.nothing", Utc::now()).await.unwrap());
}

#[tokio::test]
async fn self_grant_follows_policy() {
    let (store, _db) = setup().await;

    let err = store
        .grant(ADMIN, "users.permissions", ADMIN, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManutError::SelfGrantNotPermitted { .. }));

    // Non-sensitive modules are self-grantable by default.
    store.grant(ADMIN, "reports.view", ADMIN, None).await.unwrap();

    let (strict, _db) = setup_with(AuthzConfig {
        self_grant_policy: SelfGrantPolicy::Deny,
        ..Default::default()
    })
    .await;
    let err = strict.grant(ADMIN, "reports.view", ADMIN, None).await.unwrap_err();
    assert!(matches!(err, ManutError::SelfGrantNotPermitted { .. }));
}

#[tokio::test]
async fn list_effective_filters_and_sorts() {
    let (store, _db) = setup().await;
    let now = Utc::now();

    store.grant(42, "users.permissions", ADMIN, None).await.unwrap();
    store.grant(42, "reports.view", ADMIN, None).await.unwrap();
    store
        .grant(42, "reports.export", ADMIN, Some(now - Duration::seconds(5)))
        .await
        .unwrap();

    let names: Vec<String> = store
        .list_effective(42, now)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, ["reports.view", "users.permissions"]);

    store.revoke(42, "users.permissions", ADMIN).await.unwrap();
    store.catalog().set_active("reports.view", false).await.unwrap();
    assert!(store.list_effective(42, now).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_user_grants_includes_every_state() {
    let (store, _db) = setup().await;
    let now = Utc::now();

    store.grant(42, "reports.view", ADMIN, None).await.unwrap();
    store
        .grant(42, "reports.export", ADMIN, Some(now - Duration::seconds(5)))
        .await
        .unwrap();
    store.grant(42, "users.permissions", ADMIN, None).await.unwrap();
    store.revoke(42, "users.permissions", ADMIN).await.unwrap();

    let views = store.list_user_grants(42, now).await.unwrap();
    let summary: Vec<(&str, GrantStatus)> = views
        .iter()
        .map(|v| (v.permission.name.as_str(), v.status))
        .collect();
    assert_eq!(
        summary,
        [
            ("reports.export", GrantStatus::Expired),
            ("reports.view", GrantStatus::Effective),
            ("users.permissions", GrantStatus::Revoked),
        ]
    );
}

#[tokio::test]
async fn grant_and_revoke_are_audited() {
    let (store, db) = setup().await;

    store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    store.revoke(42, "reports.export", OTHER_ADMIN).await.unwrap();

    let audit = SurrealAuditLogRepository::new(db);
    let granted = audit
        .list(
            AuditLogFilter {
                action: Some(AuditAction::PermissionGranted),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(granted.total, 1);
    assert_eq!(granted.items[0].actor_id, ADMIN);
    assert_eq!(granted.items[0].target_user_id, Some(42));
    assert_eq!(granted.items[0].subject, "reports.export");

    let revoked = audit
        .list(
            AuditLogFilter {
                actor_id: Some(OTHER_ADMIN),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(revoked.total, 1);
    assert_eq!(revoked.items[0].action, AuditAction::PermissionRevoked);
}

/// Audit sink that always fails.
struct BrokenAudit;

impl AuditLogRepository for BrokenAudit {
    async fn append(&self, _input: CreateAuditLogEntry) -> ManutResult<AuditLogEntry> {
        Err(ManutError::Database("audit store unavailable".into()))
    }

    async fn list(
        &self,
        _filter: AuditLogFilter,
        _pagination: Pagination,
    ) -> ManutResult<PaginatedResult<AuditLogEntry>> {
        Err(ManutError::Database("audit store unavailable".into()))
    }
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_grant() {
    let db = connect().await;
    let catalog = PermissionCatalog::new(SurrealPermissionRepository::new(db.clone()));
    register_defaults(&catalog).await;
    let store = GrantStore::new(
        catalog,
        SurrealGrantRepository::new(db.clone()),
        BrokenAudit,
        AuthzConfig::default(),
    );

    store.grant(42, "reports.export", ADMIN, None).await.unwrap();
    store.revoke(42, "reports.export", ADMIN).await.unwrap();
    assert!(!store.is_effective(42, "reports.export", Utc::now()).await.unwrap());
}

fn assert_retryable<T: std::fmt::Debug>(result: &ManutResult<T>) {
    if let Err(e) = result {
        assert!(e.is_retryable(), "racing writer must see a retryable error, got {e:?}");
    }
}

async fn assert_single_consistent_record(db: &Surreal<Db>, user_id: i64) {
    let grants = SurrealGrantRepository::new(db.clone())
        .list_by_user(user_id)
        .await
        .unwrap();
    assert_eq!(grants.len(), 1, "user {user_id} must keep one record per pair");
    let grant = &grants[0];
    assert_eq!(
        grant.active,
        grant.revoked_at.is_none(),
        "active flag and revocation disagree for user {user_id}"
    );
    assert_eq!(grant.active, grant.revoked_by.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_grants_keep_one_record() {
    let (store, db) = setup().await;

    for user_id in 100..120 {
        let (first, second) = tokio::join!(
            store.grant(user_id, "reports.export", ADMIN, None),
            store.grant(user_id, "reports.export", OTHER_ADMIN, None),
        );
        assert_retryable(&first);
        assert_retryable(&second);
        assert!(
            first.is_ok() || second.is_ok(),
            "one of two racing grants must land for user {user_id}"
        );

        assert_single_consistent_record(&db, user_id).await;
        assert!(store.is_effective(user_id, "reports.export", Utc::now()).await.unwrap());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grant_and_revoke_leave_a_consistent_record() {
    let (store, db) = setup().await;

    for user_id in 200..220 {
        store.grant(user_id, "reports.export", ADMIN, None).await.unwrap();

        let (granted, revoked) = tokio::join!(
            store.grant(user_id, "reports.export", ADMIN, None),
            store.revoke(user_id, "reports.export", OTHER_ADMIN),
        );
        assert_retryable(&granted);
        assert_retryable(&revoked);

        assert_single_consistent_record(&db, user_id).await;
    }
}
