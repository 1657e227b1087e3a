//! Domain models for the authorization core.
//!
//! These are the types shared across all crates. Users themselves live
//! outside the core; they are referenced by their integer id only.

pub mod audit;
pub mod authorization;
pub mod grant;
pub mod permission;
pub mod role;

/// Identifier of a user record owned by the surrounding application.
pub type UserId = i64;

/// Actor id used for grants issued by the deployment itself
/// (catalog seeding, bootstrap administrators).
pub const SYSTEM_ACTOR: UserId = 0;
