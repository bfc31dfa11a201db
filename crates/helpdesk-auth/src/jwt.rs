//! HS256 JWT verification.
//!
//! Tokens carry `{ "id": <user id>, "role": "USER" | "AGENT" | "LEAD_AGENT" }`
//! and an optional `exp`. An `exp` in the past is rejected; a token without
//! one never expires.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use helpdesk_core::{Identity, Role, UserId};

use crate::Authenticator;
use crate::errors::AuthError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: UserId,
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Build an authenticator for the given shared secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a token for `identity`, expiring `ttl_secs` from now if given.
    pub fn issue(&self, identity: Identity, ttl_secs: Option<u64>) -> Result<String, AuthError> {
        let claims = Claims {
            id: identity.user_id,
            role: identity.role,
            exp: ttl_secs.map(|ttl| jsonwebtoken::get_current_timestamp() + ttl),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                AuthError::InvalidToken(e.to_string())
            })?;
        Ok(Identity::new(data.claims.id, data.claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn issued_token_verifies() {
        let auth = JwtAuthenticator::new("secret");
        let token = auth.issue(Identity::new(42, Role::LeadAgent), Some(60)).unwrap();
        let who = auth.authenticate(&token).unwrap();
        assert_eq!(who, Identity::new(42, Role::LeadAgent));
    }

    #[test]
    fn token_without_exp_is_accepted() {
        let auth = JwtAuthenticator::new("secret");
        let token = auth.issue(Identity::new(1, Role::User), None).unwrap();
        assert_eq!(auth.authenticate(&token).unwrap().user_id, 1);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = JwtAuthenticator::new("a")
            .issue(Identity::new(1, Role::User), None)
            .unwrap();
        assert_matches!(
            JwtAuthenticator::new("b").authenticate(&token),
            Err(AuthError::InvalidToken(_))
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = JwtAuthenticator::new("secret");
        let claims = Claims {
            id: 1,
            role: Role::Agent,
            exp: Some(jsonwebtoken::get_current_timestamp() - 3_600),
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &auth.encoding_key)
                .unwrap();
        assert_matches!(auth.authenticate(&token), Err(AuthError::InvalidToken(_)));
    }

    #[test]
    fn unknown_role_is_rejected() {
        #[derive(Serialize)]
        struct Raw {
            id: i64,
            role: &'static str,
        }
        let auth = JwtAuthenticator::new("secret");
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Raw { id: 1, role: "ADMIN" },
            &auth.encoding_key,
        )
        .unwrap();
        assert_matches!(auth.authenticate(&token), Err(AuthError::InvalidToken(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let auth = JwtAuthenticator::new("secret");
        assert_matches!(auth.authenticate("not.a.jwt"), Err(AuthError::InvalidToken(_)));
    }
}
