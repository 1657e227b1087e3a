//! EdDSA access tokens carrying the caller's identity.
//!
//! The evaluator trusts the [`Identity`] it is handed; this module is
//! where a bearer token becomes one.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use manut_core::error::ManutResult;
use manut_core::models::authorization::Identity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthzConfig;
use crate::error::IdentityError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: numeric user id, as a string.
    pub sub: String,
    /// Role claim (`solicitante`, `tecnico`, `supervisor`, `administrador`).
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

impl AccessTokenClaims {
    /// Convert verified claims into an identity. An unknown role claim is
    /// `UnknownRole`, not a silent downgrade.
    pub fn identity(&self) -> ManutResult<Identity> {
        let user_id = self
            .sub
            .parse()
            .map_err(|_| IdentityError::InvalidSubject(self.sub.clone()))?;
        Identity::from_claim(user_id, &self.role)
    }
}

/// Issue a signed EdDSA (Ed25519) JWT access token.
pub fn issue_access_token(
    identity: &Identity,
    config: &AuthzConfig,
) -> Result<String, IdentityError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: identity.user_id.to_string(),
        role: identity.role.as_str().to_string(),
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + config.access_token_lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| IdentityError::Crypto(format!("bad private key: {e}")))?;

    let header = Header::new(Algorithm::EdDSA);
    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| IdentityError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an EdDSA JWT access token.
pub fn decode_access_token(
    token: &str,
    config: &AuthzConfig,
) -> Result<AccessTokenClaims, IdentityError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| IdentityError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
            _ => IdentityError::TokenInvalid(e.to_string()),
        })
}

/// Verify a bearer token (signature, expiry, issuer) and return the
/// identity it carries. No database lookup is performed.
pub fn verify_identity(token: &str, config: &AuthzConfig) -> ManutResult<Identity> {
    let claims = decode_access_token(token, config)?;
    claims.identity()
}
