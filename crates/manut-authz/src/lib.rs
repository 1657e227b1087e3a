//! Manut Authz — role hierarchy, permission catalog, grant store and the
//! authorization evaluator, plus identity token verification.

pub mod admin;
mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod grant_store;
pub mod hierarchy;
pub mod token;

pub use admin::PermissionAdmin;
pub use catalog::PermissionCatalog;
pub use config::{AuthzConfig, SelfGrantPolicy};
pub use error::IdentityError;
pub use evaluator::AuthorizationEvaluator;
pub use grant_store::GrantStore;
pub use token::AccessTokenClaims;
