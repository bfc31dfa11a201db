//! Error taxonomy shared by the lifecycle manager, chat sessions and the HTTP
//! layer.
//!
//! Every [`CaseError`] maps to a stable machine-readable [`ErrorCode`], an HTTP
//! status, and a WebSocket close code. Only the requesting caller ever sees
//! these; they are never broadcast to a room.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Missing or invalid identity.
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    /// Valid identity, insufficient permission.
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
    /// Case or message absent, or not linked as claimed.
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// Malformed or oversized input.
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// State-machine precondition violated.
    #[serde(rename = "CONFLICT")]
    Conflict,
    /// Analysis service failure or timeout.
    #[serde(rename = "UPSTREAM_FAILURE")]
    UpstreamFailure,
    /// Anything else (storage faults, bugs).
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    /// Wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::UpstreamFailure => "UPSTREAM_FAILURE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Validation => 400,
            Self::Conflict => 409,
            Self::UpstreamFailure => 502,
            Self::Internal => 500,
        }
    }

    /// WebSocket close code (private-use range 4000–4999).
    pub fn close_code(self) -> u16 {
        4000 + self.http_status()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to a single caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseError {
    /// Missing or invalid identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Valid identity, insufficient permission for this case.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Case or message absent, or not linked as claimed.
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed or oversized input.
    #[error("validation failed: {0}")]
    Validation(String),
    /// State-machine precondition violated.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Analysis service error or timeout.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    /// Storage or other internal fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CaseError {
    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::UpstreamFailure(_) => ErrorCode::UpstreamFailure,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Human-readable detail without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Validation(m)
            | Self::Conflict(m)
            | Self::UpstreamFailure(m)
            | Self::Internal(m) => m,
        }
    }

    /// Expected outcomes are logged at debug level; the rest are faults.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::UpstreamFailure(_) | Self::Internal(_))
    }

    /// Shorthand for a missing case.
    pub fn case_not_found(case_id: crate::CaseId) -> Self {
        Self::NotFound(format!("case {case_id} not found"))
    }
}

/// Failure to parse a stored enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParseEnumError {
    /// Enum type name.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}
