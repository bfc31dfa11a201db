//! Error types for the case store.
//!
//! [`StoreError`] is returned by every repository and store operation. The
//! lifecycle layer converts it into [`CaseError`] at the boundary so callers
//! see the shared taxonomy.

use helpdesk_core::{CaseError, CaseId, MessageId};
use thiserror::Error;

/// Errors that can occur during case store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested case was not found.
    #[error("case not found: {0}")]
    CaseNotFound(CaseId),

    /// Requested message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// A conditional update found the row in the wrong state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Internal error (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for CaseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CaseNotFound(id) => CaseError::case_not_found(id),
            StoreError::MessageNotFound(id) => {
                CaseError::NotFound(format!("message {id} not found"))
            }
            StoreError::Conflict(msg) => CaseError::Conflict(msg),
            other => CaseError::Internal(other.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
