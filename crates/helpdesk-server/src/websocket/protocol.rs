//! Chat wire frames.
//!
//! Every frame is a JSON object tagged by `type`. Field names are camelCase.

use std::sync::Arc;

use helpdesk_core::{CaseError, Message, MessageId, Role, UserId};
use serde::{Deserialize, Serialize};

/// Frames a participant may send while in a room.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundFrame {
    /// Post a chat message.
    Message {
        /// Message text.
        content: String,
    },
    /// Started typing.
    Typing,
    /// Stopped typing.
    StopTyping,
    /// Delete one of the caller's own messages.
    DeleteMessage {
        /// Message to delete.
        message_id: MessageId,
    },
}

impl InboundFrame {
    /// Parse a text frame. Anything unparseable is a validation error.
    pub fn parse(text: &str) -> Result<Self, CaseError> {
        serde_json::from_str(text).map_err(|e| CaseError::Validation(format!("malformed frame: {e}")))
    }
}

/// Frames the server sends.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundFrame {
    /// Full transcript, sent only to a participant that just joined.
    History {
        /// Messages in creation order.
        messages: Vec<Message>,
    },
    /// A newly persisted message.
    Message {
        /// The message as stored.
        message: Message,
    },
    /// A message was deleted.
    MessageDeleted {
        /// Deleted message ID.
        message_id: MessageId,
    },
    /// Someone joined the room.
    UserJoined {
        /// Who.
        user_id: UserId,
        /// With which role.
        role: Role,
    },
    /// Someone left the room.
    UserLeft {
        /// Who.
        user_id: UserId,
        /// With which role.
        role: Role,
    },
    /// Typing indicator.
    Typing {
        /// Who.
        user_id: UserId,
        /// With which role.
        role: Role,
        /// Started (`true`) or stopped (`false`).
        is_typing: bool,
    },
    /// A rejected request; only ever sent to the requester.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable detail.
        message: String,
    },
}

impl OutboundFrame {
    /// Error frame for `err`.
    pub fn error(err: &CaseError) -> Self {
        Self::Error {
            code: err.code().as_str().to_string(),
            message: err.detail().to_string(),
        }
    }

    /// Serialize once for fan-out.
    pub fn encode(&self) -> Result<Arc<String>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::new)
    }
}
