//! Caller identity as supplied by the authentication layer.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::macros::string_enum;
use crate::message::SenderRole;

/// Account role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// End user who files complaints.
    User,
    /// Support agent.
    Agent,
    /// Lead agent; bypasses assignment checks when joining a case.
    LeadAgent,
}

string_enum!(Role {
    User => "USER",
    Agent => "AGENT",
    LeadAgent => "LEAD_AGENT",
});

impl Role {
    /// Whether this role works cases from the support side.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Agent | Self::LeadAgent)
    }

    /// Sender category recorded on messages written by this role.
    pub fn sender_role(self) -> SenderRole {
        match self {
            Self::User => SenderRole::User,
            Self::Agent | Self::LeadAgent => SenderRole::Agent,
        }
    }
}

/// Authenticated caller. Trusted as-is once the authenticator produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User ID.
    pub user_id: UserId,
    /// Role.
    pub role: Role,
}

impl Identity {
    /// Build an identity.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}
