//! # helpdesk-auth
//!
//! The authentication collaborator. It turns a bearer token into the
//! `(identity, role)` pair the rest of the service trusts without
//! re-deriving.

#![deny(unsafe_code)]

pub mod errors;
pub mod jwt;

pub use errors::AuthError;
pub use jwt::JwtAuthenticator;

use helpdesk_core::Identity;

/// Verifies a token and yields the caller's identity.
pub trait Authenticator: Send + Sync {
    /// Verify `token`.
    fn authenticate(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Pick the token out of an `Authorization` header value or a `token`
/// query parameter. The header wins when both are present.
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    query_token: Option<&'a str>,
) -> Result<&'a str, AuthError> {
    authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| query_token.filter(|t| !t.is_empty()))
        .ok_or(AuthError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn header_wins_over_query() {
        assert_eq!(extract_token(Some("Bearer abc"), Some("xyz")).unwrap(), "abc");
    }

    #[test]
    fn falls_back_to_query() {
        assert_eq!(extract_token(None, Some("xyz")).unwrap(), "xyz");
        assert_eq!(extract_token(Some("Basic zzz"), Some("xyz")).unwrap(), "xyz");
    }

    #[test]
    fn missing_everywhere() {
        assert_matches!(extract_token(None, None), Err(AuthError::MissingToken));
        assert_matches!(extract_token(Some("Bearer "), Some("")), Err(AuthError::MissingToken));
    }
}
