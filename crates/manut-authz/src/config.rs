//! Authorization configuration.

use serde::Deserialize;

/// Who may grant a permission to themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfGrantPolicy {
    /// No self-grants at all.
    Deny,
    /// Self-grants refused for permissions in
    /// [`AuthzConfig::sensitive_modules`].
    DenySensitive,
    /// Self-grants always allowed.
    Allow,
}

/// Configuration for the authorization services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Self-grant policy applied by the grant store (default: deny for
    /// sensitive modules).
    pub self_grant_policy: SelfGrantPolicy,
    /// Modules whose permissions are never self-grantable under
    /// [`SelfGrantPolicy::DenySensitive`].
    pub sensitive_modules: Vec<String>,
    /// Report authorization denials to the audit log (default: true).
    pub audit_denials: bool,
    /// PEM-encoded Ed25519 private key for identity token signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for identity token verification.
    pub jwt_public_key_pem: String,
    /// Identity token issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
}

impl AuthzConfig {
    /// Whether a user may grant a permission of `module` to themselves.
    pub fn permits_self_grant(&self, module: &str) -> bool {
        match self.self_grant_policy {
            SelfGrantPolicy::Deny => false,
            SelfGrantPolicy::Allow => true,
            SelfGrantPolicy::DenySensitive => !self.sensitive_modules.iter().any(|m| m == module),
        }
    }
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            self_grant_policy: SelfGrantPolicy::DenySensitive,
            sensitive_modules: vec!["users".into(), "settings".into()],
            audit_denials: true,
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "manut".into(),
            access_token_lifetime_secs: 900,
        }
    }
}
