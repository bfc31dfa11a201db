//! Analysis service errors.

use std::time::Duration;

use helpdesk_core::CaseError;
use thiserror::Error;

/// Failure of one analysis call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the model API.
    #[error("api error (status {status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// The model returned no text.
    #[error("empty response from model")]
    EmptyResponse,

    /// The model's text was not the expected JSON shape.
    #[error("malformed model output: {0}")]
    Malformed(String),

    /// The call did not finish in time.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
}

impl From<AnalysisError> for CaseError {
    fn from(err: AnalysisError) -> Self {
        CaseError::UpstreamFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::ErrorCode;

    #[test]
    fn maps_to_upstream_failure() {
        let err: CaseError = AnalysisError::Timeout(Duration::from_secs(3)).into();
        assert_eq!(err.code(), ErrorCode::UpstreamFailure);
        assert!(err.detail().contains("timed out"));
    }

    #[test]
    fn status_display() {
        let err = AnalysisError::Status {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "api error (status 503): overloaded");
    }
}
