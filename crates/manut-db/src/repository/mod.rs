//! SurrealDB repository implementations.

mod audit;
mod grant;
mod permission;

pub use audit::SurrealAuditLogRepository;
pub use grant::SurrealGrantRepository;
pub use permission::SurrealPermissionRepository;
