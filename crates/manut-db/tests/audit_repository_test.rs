//! Integration tests for the audit log repository using in-memory SurrealDB.

use chrono::Utc;
use manut_core::models::audit::{AuditAction, AuditOutcome, CreateAuditLogEntry};
use manut_core::repository::{AuditLogFilter, AuditLogRepository, Pagination};
use manut_db::repository::SurrealAuditLogRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> SurrealAuditLogRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    manut_db::run_migrations(&db).await.unwrap();
    SurrealAuditLogRepository::new(db)
}

fn entry(actor_id: i64, target: i64, action: AuditAction) -> CreateAuditLogEntry {
    CreateAuditLogEntry {
        actor_id,
        target_user_id: Some(target),
        action,
        subject: "reports.export".into(),
        outcome: AuditOutcome::Success,
        metadata: None,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn append_returns_stored_entry() {
    let repo = setup().await;

    let stored = repo
        .append(CreateAuditLogEntry {
            metadata: Some(serde_json::json!({ "expires_at": null })),
            ..entry(1, 42, AuditAction::PermissionGranted)
        })
        .await
        .unwrap();

    assert_eq!(stored.actor_id, 1);
    assert_eq!(stored.target_user_id, Some(42));
    assert_eq!(stored.action, AuditAction::PermissionGranted);
    assert_eq!(stored.outcome, AuditOutcome::Success);
    assert_eq!(stored.subject, "reports.export");
}

#[tokio::test]
async fn list_filters_by_actor_and_action() {
    let repo = setup().await;
    repo.append(entry(1, 42, AuditAction::PermissionGranted))
        .await
        .unwrap();
    repo.append(entry(1, 42, AuditAction::PermissionRevoked))
        .await
        .unwrap();
    repo.append(entry(2, 43, AuditAction::PermissionGranted))
        .await
        .unwrap();

    let all = repo
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.items.len(), 3);

    let by_actor = repo
        .list(
            AuditLogFilter {
                actor_id: Some(1),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_actor.total, 2);

    let grants_for_43 = repo
        .list(
            AuditLogFilter {
                target_user_id: Some(43),
                action: Some(AuditAction::PermissionGranted),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(grants_for_43.total, 1);
    assert_eq!(grants_for_43.items[0].actor_id, 2);
}

#[tokio::test]
async fn list_paginates() {
    let repo = setup().await;
    for i in 0..5 {
        repo.append(entry(1, i, AuditAction::PermissionGranted))
            .await
            .unwrap();
    }

    let page = repo
        .list(
            AuditLogFilter::default(),
            Pagination {
                offset: 2,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.offset, 2);
}
