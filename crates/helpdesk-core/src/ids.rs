//! Identifier types.
//!
//! Cases, messages, analysis results and users are keyed by the integer
//! row IDs the store assigns. Live connections are process-local and get a
//! time-ordered UUID v7 instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Case (complaint) identifier.
pub type CaseId = i64;
/// Chat message identifier.
pub type MessageId = i64;
/// Analysis result identifier.
pub type ResultId = i64;
/// User identifier, as carried in the authentication token.
pub type UserId = i64;

/// Identifier of one live WebSocket connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new random ID (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
