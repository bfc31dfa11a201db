//! Request authentication.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use helpdesk_auth::extract_token;
use helpdesk_core::{CaseError, Identity, Role};
use serde::Deserialize;

use super::error::ApiError;
use crate::server::AppState;

/// The authenticated caller. Reads a bearer token from `Authorization`,
/// falling back to a `token` query parameter for WebSocket clients that
/// cannot set headers.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub Identity);

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let query = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token);
        let token = extract_token(header, query.as_deref())?;
        let identity = state.authenticator.authenticate(token)?;
        Ok(Self(identity))
    }
}

impl AuthUser {
    /// Require one of `roles`.
    pub fn require(&self, roles: &[Role], action: &str) -> Result<Identity, ApiError> {
        if roles.contains(&self.0.role) {
            Ok(self.0)
        } else {
            Err(ApiError(CaseError::Forbidden(format!(
                "{} cannot {action}",
                self.0.role
            ))))
        }
    }
}
