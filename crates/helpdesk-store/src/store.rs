//! The Case Store contract consumed by the lifecycle manager, chat sessions
//! and the sweeper.
//!
//! Every write that depends on a prior state is a single conditional
//! statement, so concurrent callers cannot both pass a precondition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_core::{
    AnalysisResult, Case, CaseId, CaseStatus, Category, Message, MessageId, ResolutionAnalysis,
    ResolvedBy, SenderRole, UserId,
};

use crate::errors::Result;

/// A status transition applied atomically by [`CaseStore::update_case_status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseTransition {
    /// OPEN and unassigned → `IN_PROGRESS` with this assignee.
    Assign {
        /// Agent taking the case.
        agent_id: UserId,
    },
    /// OPEN or `IN_PROGRESS` → RESOLVED, stamping the timestamp for `by`.
    /// Requires the case's analysis result to exist already.
    Resolve {
        /// Who resolved the case.
        by: ResolvedBy,
    },
}

/// A message to persist.
#[derive(Clone, Debug)]
pub struct NewMessage {
    /// Owning case.
    pub case_id: CaseId,
    /// Author.
    pub sender_id: UserId,
    /// Author's side.
    pub sender_role: SenderRole,
    /// Validated content.
    pub content: String,
}

/// An unresolved case past the staleness threshold, with everything the
/// sweeper needs to resolve it.
#[derive(Clone, Debug)]
pub struct StaleCase {
    /// The case.
    pub case: Case,
    /// Its transcript in creation order.
    pub messages: Vec<Message>,
    /// Its analysis result, if one was already written.
    pub result: Option<AnalysisResult>,
}

/// Filter for [`CaseStore::list_cases`].
#[derive(Clone, Debug, Default)]
pub struct CaseFilter {
    /// Only cases owned by this user.
    pub user_id: Option<UserId>,
    /// Only cases in this status.
    pub status: Option<CaseStatus>,
    /// Maximum number of cases.
    pub limit: Option<u32>,
}

/// Analysis result counts by sentiment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SentimentCounts {
    /// Positive results.
    pub positive: u64,
    /// Neutral results.
    pub neutral: u64,
    /// Negative results.
    pub negative: u64,
    /// Results without a sentiment.
    pub unknown: u64,
}

impl SentimentCounts {
    /// Results that carry a sentiment.
    pub fn total(&self) -> u64 {
        self.positive + self.neutral + self.negative
    }
}

/// Persistence for cases, messages and analysis results.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Fetch a case.
    async fn get_case(&self, case_id: CaseId) -> Result<Option<Case>>;

    /// Insert a new OPEN, unassigned case.
    async fn create_case(&self, owner: UserId, category: Category, priority: u8) -> Result<Case>;

    /// Apply a transition if the case is in the expected prior state.
    ///
    /// Fails with `CaseNotFound` for an unknown case and `Conflict` when the
    /// precondition does not hold.
    async fn update_case_status(&self, case_id: CaseId, transition: CaseTransition) -> Result<Case>;

    /// Persist a message.
    async fn create_message(&self, message: NewMessage) -> Result<Message>;

    /// Fetch a message.
    async fn get_message(&self, message_id: MessageId) -> Result<Option<Message>>;

    /// Delete a message. Fails with `MessageNotFound` if it does not exist.
    async fn delete_message(&self, message_id: MessageId) -> Result<()>;

    /// All messages of a case, ordered by creation time.
    async fn list_messages(&self, case_id: CaseId) -> Result<Vec<Message>>;

    /// Delete every message created strictly before `cutoff`. Returns the
    /// number deleted.
    async fn delete_messages_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Write the analysis result for a case. If one already exists it is
    /// returned unchanged.
    async fn create_analysis_result(
        &self,
        case_id: CaseId,
        analysis: ResolutionAnalysis,
    ) -> Result<AnalysisResult>;

    /// Fetch the analysis result of a case.
    async fn get_analysis_result(&self, case_id: CaseId) -> Result<Option<AnalysisResult>>;

    /// Cases in `statuses` created strictly before `older_than`, each with
    /// its messages and existing result.
    async fn find_stale_cases(
        &self,
        statuses: &[CaseStatus],
        older_than: DateTime<Utc>,
    ) -> Result<Vec<StaleCase>>;

    /// List cases, oldest first.
    async fn list_cases(&self, filter: CaseFilter) -> Result<Vec<Case>>;

    /// Cases created, or resolved, at or after `since`.
    async fn cases_touched_since(&self, since: DateTime<Utc>) -> Result<Vec<Case>>;

    /// Count analysis results by sentiment.
    async fn sentiment_counts(&self) -> Result<SentimentCounts>;
}
