//! SurrealDB implementation of [`PermissionRepository`].

use chrono::{DateTime, Utc};
use manut_core::error::ManutResult;
use manut_core::models::permission::{CreatePermission, Permission, PermissionFilter};
use manut_core::repository::PermissionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    name: String,
    module: String,
    action: String,
    resource: Option<String>,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    name: String,
    module: String,
    action: String,
    resource: Option<String>,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_permission(row: PermissionRow, id: Uuid) -> Permission {
    Permission {
        id,
        name: row.name,
        module: row.module,
        action: row.action,
        resource: row.resource,
        description: row.description,
        active: row.active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid permission UUID: {e}")))?;
        Ok(Permission {
            id,
            name: self.name,
            module: self.module,
            action: self.action,
            resource: self.resource,
            description: self.description,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_permission(rows: Vec<PermissionRowWithId>) -> Result<Option<Permission>, DbError> {
    rows.into_iter()
        .next()
        .map(PermissionRowWithId::try_into_permission)
        .transpose()
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> ManutResult<Permission> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, module = $module, action = $action, \
                 resource = $resource, description = $description, \
                 active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("module", input.module))
            .bind(("action", input.action))
            .bind(("resource", input.resource))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("permission", &id_str, e))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(row_to_permission(row, id))
    }

    async fn find_by_name(&self, name: &str) -> ManutResult<Option<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE name = $name LIMIT 1",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_permission(rows)?)
    }

    async fn find_by_id(&self, id: Uuid) -> ManutResult<Option<Permission>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('permission', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| row_to_permission(row, id)))
    }

    async fn find_by_key(
        &self,
        module: &str,
        action: &str,
        resource: Option<&str>,
    ) -> ManutResult<Option<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE module = $module AND action = $action \
                 AND resource = $resource LIMIT 1",
            )
            .bind(("module", module.to_string()))
            .bind(("action", action.to_string()))
            .bind(("resource", resource.map(str::to_string)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_permission(rows)?)
    }

    async fn set_active(&self, name: &str, active: bool) -> ManutResult<Option<Permission>> {
        let result = self
            .db
            .query(
                "UPDATE permission SET active = $active, \
                 updated_at = time::now() \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement("permission", name, e))?;

        self.find_by_name(name).await
    }

    async fn list(&self, filter: PermissionFilter) -> ManutResult<Vec<Permission>> {
        let mut conditions = Vec::new();
        if filter.module.is_some() {
            conditions.push("module = $module");
        }
        if filter.active.is_some() {
            conditions.push("active = $active");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM permission {where_clause} \
             ORDER BY module ASC, action ASC, name ASC"
        );

        let mut builder = self.db.query(&query);
        if let Some(module) = filter.module {
            builder = builder.bind(("module", module));
        }
        if let Some(active) = filter.active {
            builder = builder.bind(("active", active));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        let permissions = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(permissions)
    }
}
