//! Chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CaseId, MessageId, UserId};
use crate::macros::string_enum;

/// Which side of the conversation wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderRole {
    /// Case owner.
    User,
    /// Support staff.
    Agent,
}

string_enum!(SenderRole {
    User => "USER",
    Agent => "AGENT",
});

/// A persisted chat message. Never updated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID.
    pub id: MessageId,
    /// Owning case.
    pub case_id: CaseId,
    /// Author.
    pub sender_id: UserId,
    /// Author's side.
    pub sender_role: SenderRole,
    /// Text content.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
