//! Cases (complaints) and their status field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::ids::{CaseId, UserId};
use crate::macros::string_enum;

/// Case status. `Resolved` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    /// Filed, nobody assigned yet.
    Open,
    /// An agent has taken the case.
    InProgress,
    /// Closed by the owner or by the sweeper.
    Resolved,
}

string_enum!(CaseStatus {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    Resolved => "RESOLVED",
});

impl CaseStatus {
    /// Statuses a case can still leave.
    pub const UNRESOLVED: &'static [CaseStatus] = &[CaseStatus::Open, CaseStatus::InProgress];

    /// Whether the state machine permits `self → next`.
    pub fn can_transition_to(self, next: CaseStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::InProgress | Self::Resolved) | (Self::InProgress, Self::Resolved)
        )
    }

    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        self == Self::Resolved
    }
}

/// Complaint category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Software defect.
    Bug,
    /// Billing or payment problem.
    Payment,
    /// Account access or data problem.
    Account,
    /// Abuse or harassment report.
    Harassment,
    /// Anything else.
    #[default]
    Other,
}

string_enum!(Category {
    Bug => "BUG",
    Payment => "PAYMENT",
    Account => "ACCOUNT",
    Harassment => "HARASSMENT",
    Other => "OTHER",
});

impl Category {
    /// Fixed priority (1 lowest, 5 highest) for a category.
    pub fn priority(self) -> u8 {
        match self {
            Self::Harassment => 5,
            Self::Payment => 4,
            Self::Bug => 3,
            Self::Account => 2,
            Self::Other => 1,
        }
    }
}

/// Who closed a case. Decides which resolution timestamp is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolvedBy {
    /// The owning user resolved it.
    User,
    /// The lifecycle sweeper forced it.
    System,
}

string_enum!(ResolvedBy {
    User => "USER",
    System => "SYSTEM",
});

/// A support case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    /// Case ID.
    pub id: CaseId,
    /// Owning user.
    pub user_id: UserId,
    /// Assigned agent, if any.
    pub assigned_agent_id: Option<UserId>,
    /// Current status.
    pub status: CaseStatus,
    /// Category.
    pub category: Option<Category>,
    /// Priority, 1–5.
    pub priority: Option<u8>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Set when the sweeper resolved the case.
    pub system_resolved_at: Option<DateTime<Utc>>,
    /// Set when the owner resolved the case.
    pub user_resolved_at: Option<DateTime<Utc>>,
}

impl Case {
    /// Whether the case reached its terminal state.
    pub fn is_resolved(&self) -> bool {
        self.status == CaseStatus::Resolved
    }

    /// When the case was resolved, by whichever path.
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.system_resolved_at.or(self.user_resolved_at)
    }

    /// Whether the caller may take part in this case's chat room.
    ///
    /// Owner, assigned agent, or any lead agent.
    pub fn grants_room_access(&self, who: &Identity) -> bool {
        self.is_owned_by(who) || self.is_assigned_to(who) || who.role == crate::Role::LeadAgent
    }

    /// Whether the caller may write messages into this case.
    ///
    /// Owner or assigned agent only; an unassigned lead agent can observe but
    /// not write.
    pub fn grants_write_access(&self, who: &Identity) -> bool {
        self.is_owned_by(who) || self.is_assigned_to(who)
    }

    /// Owner check (role must be `User`).
    pub fn is_owned_by(&self, who: &Identity) -> bool {
        who.role == crate::Role::User && self.user_id == who.user_id
    }

    /// Assigned-agent check (role must be staff).
    pub fn is_assigned_to(&self, who: &Identity) -> bool {
        who.role.is_staff() && self.assigned_agent_id == Some(who.user_id)
    }

    /// Checks the status/timestamp/assignee invariants.
    ///
    /// `Resolved` ⇔ exactly one resolution timestamp is set, and an assignee
    /// implies `InProgress` or `Resolved`.
    pub fn invariants_hold(&self) -> bool {
        let stamps =
            usize::from(self.system_resolved_at.is_some()) + usize::from(self.user_resolved_at.is_some());
        let resolution_ok = if self.is_resolved() { stamps == 1 } else { stamps == 0 };
        let assignee_ok = self.assigned_agent_id.is_none() || self.status != CaseStatus::Open;
        resolution_ok && assignee_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn case(status: CaseStatus) -> Case {
        Case {
            id: 1,
            user_id: 10,
            assigned_agent_id: None,
            status,
            category: Some(Category::Bug),
            priority: Some(3),
            created_at: Utc::now(),
            system_resolved_at: None,
            user_resolved_at: None,
        }
    }

    #[test]
    fn priority_table() {
        assert_eq!(Category::Harassment.priority(), 5);
        assert_eq!(Category::Payment.priority(), 4);
        assert_eq!(Category::Bug.priority(), 3);
        assert_eq!(Category::Account.priority(), 2);
        assert_eq!(Category::Other.priority(), 1);
        assert_eq!(Category::default(), Category::Other);
    }

    #[test]
    fn transitions() {
        use CaseStatus::*;
        assert!(Open.can_transition_to(InProgress));
        assert!(Open.can_transition_to(Resolved));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(!InProgress.can_transition_to(Open));
        for next in CaseStatus::ALL {
            assert!(!Resolved.can_transition_to(*next));
        }
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&CaseStatus::InProgress).unwrap(), "\"IN_PROGRESS\"");
        assert_eq!("RESOLVED".parse::<CaseStatus>().unwrap(), CaseStatus::Resolved);
    }

    #[test]
    fn room_access_rules() {
        let mut c = case(CaseStatus::InProgress);
        c.assigned_agent_id = Some(20);
        assert!(c.grants_room_access(&Identity::new(10, Role::User)));
        assert!(c.grants_room_access(&Identity::new(20, Role::Agent)));
        assert!(c.grants_room_access(&Identity::new(99, Role::LeadAgent)));
        assert!(!c.grants_room_access(&Identity::new(21, Role::Agent)));
        assert!(!c.grants_room_access(&Identity::new(11, Role::User)));
        // A user whose ID happens to equal the assignee's is not the agent.
        assert!(!c.grants_room_access(&Identity::new(20, Role::User)));
    }

    #[test]
    fn unassigned_lead_cannot_write() {
        let c = case(CaseStatus::Open);
        let lead = Identity::new(99, Role::LeadAgent);
        assert!(c.grants_room_access(&lead));
        assert!(!c.grants_write_access(&lead));
    }

    #[test]
    fn resolved_by_wire_names() {
        assert_eq!(ResolvedBy::System.to_string(), "SYSTEM");
        assert_eq!("USER".parse::<ResolvedBy>().unwrap(), ResolvedBy::User);
    }

    #[test]
    fn invariants() {
        let mut c = case(CaseStatus::Open);
        assert!(c.invariants_hold());
        c.assigned_agent_id = Some(5);
        assert!(!c.invariants_hold());
        c.status = CaseStatus::Resolved;
        assert!(!c.invariants_hold());
        c.user_resolved_at = Some(Utc::now());
        assert!(c.invariants_hold());
        c.system_resolved_at = Some(Utc::now());
        assert!(!c.invariants_hold());
    }
}
