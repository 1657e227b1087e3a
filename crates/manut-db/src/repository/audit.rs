//! SurrealDB implementation of [`AuditLogRepository`].

use chrono::{DateTime, Utc};
use manut_core::error::ManutResult;
use manut_core::models::audit::{AuditAction, AuditLogEntry, AuditOutcome, CreateAuditLogEntry};
use manut_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    actor_id: i64,
    target_user_id: Option<i64>,
    action: String,
    subject: String,
    outcome: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    actor_id: i64,
    target_user_id: Option<i64>,
    action: String,
    subject: String,
    outcome: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_action(s: &str) -> Result<AuditAction, DbError> {
    match s {
        "PermissionRegistered" => Ok(AuditAction::PermissionRegistered),
        "PermissionActivated" => Ok(AuditAction::PermissionActivated),
        "PermissionDeactivated" => Ok(AuditAction::PermissionDeactivated),
        "PermissionGranted" => Ok(AuditAction::PermissionGranted),
        "PermissionRevoked" => Ok(AuditAction::PermissionRevoked),
        "AuthorizationDenied" => Ok(AuditAction::AuthorizationDenied),
        other => Err(DbError::Decode(format!("unknown audit action: {other}"))),
    }
}

fn parse_outcome(s: &str) -> Result<AuditOutcome, DbError> {
    match s {
        "Success" => Ok(AuditOutcome::Success),
        "Failure" => Ok(AuditOutcome::Failure),
        "Denied" => Ok(AuditOutcome::Denied),
        other => Err(DbError::Decode(format!("unknown audit outcome: {other}"))),
    }
}

fn row_to_entry(row: AuditRow, id: Uuid) -> Result<AuditLogEntry, DbError> {
    Ok(AuditLogEntry {
        id,
        actor_id: row.actor_id,
        target_user_id: row.target_user_id,
        action: parse_action(&row.action)?,
        subject: row.subject,
        outcome: parse_outcome(&row.outcome)?,
        metadata: row.metadata,
        timestamp: row.timestamp,
    })
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid audit UUID: {e}")))?;
        Ok(AuditLogEntry {
            id,
            actor_id: self.actor_id,
            target_user_id: self.target_user_id,
            action: parse_action(&self.action)?,
            subject: self.subject,
            outcome: parse_outcome(&self.outcome)?,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the append-only audit log.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> ManutResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 actor_id = $actor_id, \
                 target_user_id = $target_user_id, \
                 action = $action, \
                 subject = $subject, \
                 outcome = $outcome, \
                 metadata = $metadata, \
                 timestamp = $timestamp",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", input.actor_id))
            .bind(("target_user_id", input.target_user_id))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("subject", input.subject))
            .bind(("outcome", input.outcome.as_str().to_string()))
            .bind((
                "metadata",
                input.metadata.unwrap_or_else(|| serde_json::json!({})),
            ))
            .bind(("timestamp", input.timestamp))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("audit_log", &id_str, e))?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row_to_entry(row, id)?)
    }

    async fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> ManutResult<PaginatedResult<AuditLogEntry>> {
        let mut conditions = Vec::new();
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.target_user_id.is_some() {
            conditions.push("target_user_id = $target_user_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        if filter.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if filter.to.is_some() {
            conditions.push("timestamp <= $to");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Statement 0 counts, statement 1 fetches the page.
        let query = format!(
            "SELECT count() AS total FROM audit_log {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM audit_log {where_clause} \
             ORDER BY timestamp DESC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(actor_id) = filter.actor_id {
            builder = builder.bind(("actor_id", actor_id));
        }
        if let Some(target_user_id) = filter.target_user_id {
            builder = builder.bind(("target_user_id", target_user_id));
        }
        if let Some(action) = filter.action {
            builder = builder.bind(("action", action.as_str().to_string()));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<AuditRowWithId> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
