//! Connection to the SurrealDB instance holding the permission catalog,
//! user grants and the audit log.

use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use crate::error::DbError;

/// Where the authorization tables live. Every field has a default, so a
/// partial `db` section in the server configuration is enough.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Host and port of the WebSocket endpoint, without a scheme.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "manut".into(),
            database: "authz".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Owns the remote client. Repositories take a clone of [`Self::client`].
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the WebSocket, sign in as root and select the configured
    /// namespace and database. Each step reports which one failed.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let db = Surreal::new::<Ws>(&config.url)
            .await
            .map_err(|e| connect_failed(config, "open", e))?;
        debug!(url = %config.url, "websocket open");

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(|e| connect_failed(config, "sign-in", e))?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| connect_failed(config, "select namespace", e))?;

        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "connected to grant store"
        );
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

fn connect_failed(config: &DbConfig, stage: &str, err: impl std::fmt::Display) -> DbError {
    DbError::Connection {
        url: config.url.clone(),
        reason: format!("{stage}: {err}"),
    }
}
