//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Unique permission name (e.g., `users.delete`).
    pub name: String,
    /// Owning module (e.g., `users`).
    pub module: String,
    /// Action within the module (e.g., `delete`).
    pub action: String,
    /// Optional sub-scope within the module.
    pub resource: Option<String>,
    pub description: Option<String>,
    /// Inactive permissions can never be satisfied, whatever the grants say.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Whether this permission carries exactly the given registration
    /// fields.
    pub fn matches(&self, input: &CreatePermission) -> bool {
        self.name == input.name
            && self.module == input.module
            && self.action == input.action
            && self.resource == input.resource
            && self.description == input.description
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub module: String,
    pub action: String,
    pub resource: Option<String>,
    pub description: Option<String>,
}

impl CreatePermission {
    pub fn new(name: impl Into<String>, module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            action: action.into(),
            resource: None,
            description: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Query filters for catalog listings.
#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub module: Option<String>,
    pub active: Option<bool>,
}
