//! Authentication errors.

use helpdesk_core::CaseError;
use thiserror::Error;

/// Why a request could not be tied to an identity.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token in the header or query string.
    #[error("no token provided")]
    MissingToken,

    /// Token failed verification or carried unusable claims.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<AuthError> for CaseError {
    fn from(err: AuthError) -> Self {
        CaseError::Unauthorized(err.to_string())
    }
}
