//! Tables for the permission catalog, user grants and the audit log, and
//! the versioned steps that create them.
//!
//! Tables are SCHEMAFULL. Permission ids are stored as strings, user ids
//! as ints, and audit enums as strings checked with ASSERT.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

impl Migration {
    fn failed(&self, step: &str, err: impl std::fmt::Display) -> DbError {
        DbError::Migration(format!("v{} {} ({step}): {err}", self.version, self.name))
    }
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "permission_catalog_and_grants",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "audit_log",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1 — permission catalog and user grants
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Permission catalog (process-wide)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD module ON TABLE permission TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD action ON TABLE permission TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD resource ON TABLE permission TYPE option<string>;
DEFINE FIELD description ON TABLE permission TYPE option<string>;
DEFINE FIELD active ON TABLE permission TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_name ON TABLE permission \
    COLUMNS name UNIQUE;
DEFINE INDEX idx_permission_key ON TABLE permission \
    COLUMNS module, action, resource UNIQUE;
DEFINE INDEX idx_permission_module ON TABLE permission \
    COLUMNS module;

-- =======================================================================
-- User permission grants (one record per user/permission pair)
-- =======================================================================
DEFINE TABLE user_permission SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update FULL
        FOR delete NONE;
DEFINE FIELD user_id ON TABLE user_permission TYPE int;
DEFINE FIELD permission_id ON TABLE user_permission TYPE string;
DEFINE FIELD granted_by ON TABLE user_permission TYPE int;
DEFINE FIELD granted_at ON TABLE user_permission TYPE datetime;
DEFINE FIELD revoked_by ON TABLE user_permission TYPE option<int>;
DEFINE FIELD revoked_at ON TABLE user_permission TYPE option<datetime>;
DEFINE FIELD expires_at ON TABLE user_permission TYPE option<datetime>;
DEFINE FIELD active ON TABLE user_permission TYPE bool DEFAULT true;
DEFINE FIELD version ON TABLE user_permission TYPE int DEFAULT 1;
DEFINE FIELD created_at ON TABLE user_permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_permission_pair ON TABLE user_permission \
    COLUMNS user_id, permission_id UNIQUE;
DEFINE INDEX idx_user_permission_permission ON TABLE user_permission \
    COLUMNS permission_id;
";

// -----------------------------------------------------------------------
// Schema v2 — audit log
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD actor_id ON TABLE audit_log TYPE int;
DEFINE FIELD target_user_id ON TABLE audit_log TYPE option<int>;
DEFINE FIELD action ON TABLE audit_log TYPE string \
    ASSERT $value IN ['PermissionRegistered', 'PermissionActivated', \
    'PermissionDeactivated', 'PermissionGranted', 'PermissionRevoked', \
    'AuthorizationDenied'];
DEFINE FIELD subject ON TABLE audit_log TYPE string;
DEFINE FIELD outcome ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_log COLUMNS timestamp;
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS actor_id;
DEFINE INDEX idx_audit_target ON TABLE audit_log COLUMNS target_user_id;
";

/// Bring the schema up to [`latest_version`].
///
/// The `_migration` table records every applied step, so only steps
/// newer than its highest version run. Each step is recorded right after
/// it succeeds; a failure leaves earlier steps in place for the next start.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("migration table: {e}")))?;

    let applied = applied_version(db).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        debug!(version = applied, "schema up to date");
        return Ok(());
    }
    info!(from = applied, to = latest_version(), steps = pending.len(), "migrating schema");

    for migration in pending {
        apply(db, migration).await?;
    }
    Ok(())
}

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map_or(0, |r| r.version))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    db.query(migration.sql)
        .await?
        .check()
        .map_err(|e| migration.failed("apply", e))?;
    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| migration.failed("record", e))?;

    info!(version = migration.version, name = migration.name, "migration applied");
    Ok(())
}

/// Latest schema version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
