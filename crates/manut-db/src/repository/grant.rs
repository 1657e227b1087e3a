//! SurrealDB implementation of [`GrantRepository`].
//!
//! Records live in the `user_permission` table. Every write bumps
//! `version`; updates only apply when the stored version still equals
//! the one the caller read, so two administrators racing on the same
//! pair cannot interleave their writes.

use chrono::{DateTime, Utc};
use manut_core::error::ManutResult;
use manut_core::models::UserId;
use manut_core::models::grant::{CreateGrant, Grant, GrantState};
use manut_core::repository::GrantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct GrantRow {
    user_id: i64,
    permission_id: String,
    granted_by: i64,
    granted_at: DateTime<Utc>,
    revoked_by: Option<i64>,
    revoked_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct GrantRowWithId {
    record_id: String,
    user_id: i64,
    permission_id: String,
    granted_by: i64,
    granted_at: DateTime<Utc>,
    revoked_by: Option<i64>,
    revoked_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_grant(row: GrantRow, id: Uuid) -> Result<Grant, DbError> {
    let permission_id = Uuid::parse_str(&row.permission_id)
        .map_err(|e| DbError::Decode(format!("invalid permission UUID: {e}")))?;
    Ok(Grant {
        id,
        user_id: row.user_id,
        permission_id,
        granted_by: row.granted_by,
        granted_at: row.granted_at,
        revoked_by: row.revoked_by,
        revoked_at: row.revoked_at,
        expires_at: row.expires_at,
        active: row.active,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl GrantRowWithId {
    fn try_into_grant(self) -> Result<Grant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid grant UUID: {e}")))?;
        let permission_id = Uuid::parse_str(&self.permission_id)
            .map_err(|e| DbError::Decode(format!("invalid permission UUID: {e}")))?;
        Ok(Grant {
            id,
            user_id: self.user_id,
            permission_id,
            granted_by: self.granted_by,
            granted_at: self.granted_at,
            revoked_by: self.revoked_by,
            revoked_at: self.revoked_at,
            expires_at: self.expires_at,
            active: self.active,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Grant repository.
#[derive(Clone)]
pub struct SurrealGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GrantRepository for SurrealGrantRepository<C> {
    async fn find(&self, user_id: UserId, permission_id: Uuid) -> ManutResult<Option<Grant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_permission \
                 WHERE user_id = $user_id AND permission_id = $permission_id \
                 LIMIT 1",
            )
            .bind(("user_id", user_id))
            .bind(("permission_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        let grant = rows
            .into_iter()
            .next()
            .map(GrantRowWithId::try_into_grant)
            .transpose()?;
        Ok(grant)
    }

    async fn insert(&self, input: CreateGrant) -> ManutResult<Grant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let pair = format!("{}:{}", input.user_id, input.permission_id);

        let result = self
            .db
            .query(
                "CREATE type::record('user_permission', $id) SET \
                 user_id = $user_id, \
                 permission_id = $permission_id, \
                 granted_by = $granted_by, \
                 granted_at = $granted_at, \
                 expires_at = $expires_at, \
                 active = true, \
                 version = 1",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id))
            .bind(("permission_id", input.permission_id.to_string()))
            .bind(("granted_by", input.granted_by))
            .bind(("granted_at", input.granted_at))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("user_permission", &pair, e))?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_permission".into(),
            id: id_str,
        })?;

        Ok(row_to_grant(row, id)?)
    }

    async fn update(&self, id: Uuid, expected_version: u64, state: GrantState) -> ManutResult<Grant> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('user_permission', $id) SET \
                 active = $active, \
                 granted_by = $granted_by, \
                 granted_at = $granted_at, \
                 revoked_by = $revoked_by, \
                 revoked_at = $revoked_at, \
                 expires_at = $expires_at, \
                 version = version + 1, \
                 updated_at = time::now() \
                 WHERE version = $expected_version",
            )
            .bind(("id", id_str.clone()))
            .bind(("active", state.active))
            .bind(("granted_by", state.granted_by))
            .bind(("granted_at", state.granted_at))
            .bind(("revoked_by", state.revoked_by))
            .bind(("revoked_at", state.revoked_at))
            .bind(("expires_at", state.expires_at))
            .bind(("expected_version", expected_version))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("user_permission", &id_str, e))?;

        // An empty result means another writer bumped the version first.
        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::Conflict {
            entity: "user_permission".into(),
            id: id_str,
        })?;

        Ok(row_to_grant(row, id)?)
    }

    async fn list_by_user(&self, user_id: UserId) -> ManutResult<Vec<Grant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_permission \
                 WHERE user_id = $user_id \
                 ORDER BY granted_at ASC",
            )
            .bind(("user_id", user_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;

        let grants = rows
            .into_iter()
            .map(|row| row.try_into_grant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(grants)
    }
}
