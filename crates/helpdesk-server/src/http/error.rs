//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use helpdesk_auth::AuthError;
use helpdesk_core::CaseError;
use serde_json::json;
use tracing::{debug, error};

/// A [`CaseError`] rendered as `{"error":{"code","message"}}` with the
/// matching status.
#[derive(Debug)]
pub struct ApiError(pub CaseError);

impl From<CaseError> for ApiError {
    fn from(err: CaseError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.is_expected() {
            debug!(%code, error = %self.0, "request rejected");
        } else {
            error!(%code, error = %self.0, "request failed");
        }
        let body = json!({
            "error": {
                "code": code.as_str(),
                "message": self.0.detail(),
            }
        });
        (status, Json(body)).into_response()
    }
}
