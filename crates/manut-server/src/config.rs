//! Server configuration: defaults, an optional `manut.json` in the working
//! directory, then `MANUT__*` environment overrides.

use config::{Config, ConfigError, Environment, File};
use manut_authz::AuthzConfig;
use manut_core::models::UserId;
use manut_db::DbConfig;
use serde::Deserialize;

const CONFIG_FILE: &str = "manut.json";
const ENV_PREFIX: &str = "MANUT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db: DbConfig,
    pub authz: AuthzConfig,
    pub bootstrap: BootstrapConfig,
}

/// Users who receive `users.permissions` at startup so that a fresh
/// deployment has someone able to administer grants.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub administrators: Vec<UserId>,
}

impl AppConfig {
    /// Load from `manut.json` (if present) and the environment, e.g.
    /// `MANUT__DB__URL=db:8000` or `MANUT__BOOTSTRAP__ADMINISTRATORS=1,2`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("__")
                        .separator("__")
                        .list_separator(",")
                        .with_list_parse_key("bootstrap.administrators")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
