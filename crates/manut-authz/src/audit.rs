//! Best-effort audit recording shared by the authorization services.

use manut_core::models::audit::CreateAuditLogEntry;
use manut_core::repository::AuditLogRepository;
use tracing::warn;

/// Append an entry, logging instead of failing when the audit store is
/// unavailable. The primary operation has already committed.
pub(crate) async fn record<A: AuditLogRepository>(audit: &A, entry: CreateAuditLogEntry) {
    let action = entry.action.as_str();
    let subject = entry.subject.clone();
    if let Err(e) = audit.append(entry).await {
        warn!(error = %e, action, subject = %subject, "failed to write audit log entry");
    }
}
