//! Identity token error types.

use manut_core::error::ManutError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("invalid subject claim: {0}")]
    InvalidSubject(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<IdentityError> for ManutError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::TokenExpired
            | IdentityError::TokenInvalid(_)
            | IdentityError::InvalidSubject(_) => ManutError::AuthenticationFailed {
                reason: err.to_string(),
            },
            IdentityError::Crypto(msg) => ManutError::Internal(format!("cryptography error: {msg}")),
        }
    }
}
