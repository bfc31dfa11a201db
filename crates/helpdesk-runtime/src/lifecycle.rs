//! Case Lifecycle Manager.
//!
//! Owns the `OPEN → IN_PROGRESS → RESOLVED` state machine. Resolution is
//! two-phase: the analysis result is written first and the status flip is
//! conditioned on it existing, so a failed analysis never flips the status
//! and a failed flip leaves only a harmless result behind. A later attempt
//! reuses that result instead of paying for a second analysis.

use std::sync::Arc;
use std::time::Duration;

use helpdesk_analysis::{AnalysisError, AnalysisService};
use helpdesk_core::{
    AnalysisResult, Case, CaseError, CaseId, CaseStatus, Category, ConversationSummary,
    Identity, Message, MessageId, ResolutionAnalysis, ResolvedBy, Role, UserId,
};
use helpdesk_store::{CaseFilter, CaseStore, CaseTransition, StoreError};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// A case with its transcript and analysis result.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetails {
    /// The case.
    #[serde(flatten)]
    pub case: Case,
    /// Transcript in creation order.
    pub messages: Vec<Message>,
    /// Analysis result, once resolved.
    pub result: Option<AnalysisResult>,
}

/// The case state machine and the read paths that apply its access rules.
pub struct CaseLifecycle {
    store: Arc<dyn CaseStore>,
    analysis: Arc<dyn AnalysisService>,
    analysis_timeout: Duration,
}

impl CaseLifecycle {
    /// Create a lifecycle manager. Every analysis call is bounded by
    /// `analysis_timeout`.
    pub fn new(
        store: Arc<dyn CaseStore>,
        analysis: Arc<dyn AnalysisService>,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            store,
            analysis,
            analysis_timeout,
        }
    }

    /// The store this manager writes through.
    pub fn store(&self) -> &Arc<dyn CaseStore> {
        &self.store
    }

    /// Open a new case. Priority follows from the category; no category
    /// means OTHER.
    #[instrument(skip(self))]
    pub async fn create(&self, owner: UserId, category: Option<Category>) -> Result<Case, CaseError> {
        let category = category.unwrap_or_default();
        let case = self
            .store
            .create_case(owner, category, category.priority())
            .await?;
        info!(case_id = case.id, priority = category.priority(), "case created");
        Ok(case)
    }

    /// Fetch a case.
    pub async fn get(&self, case_id: CaseId) -> Result<Case, CaseError> {
        self.store
            .get_case(case_id)
            .await?
            .ok_or_else(|| CaseError::case_not_found(case_id))
    }

    /// Assign an OPEN, unassigned case to an agent, moving it to
    /// `IN_PROGRESS`. Any other state, including a missing case, is a
    /// conflict.
    #[instrument(skip(self))]
    pub async fn assign(&self, case_id: CaseId, agent_id: UserId) -> Result<Case, CaseError> {
        match self
            .store
            .update_case_status(case_id, CaseTransition::Assign { agent_id })
            .await
        {
            Ok(case) => {
                info!(case_id, agent_id, "case assigned");
                Ok(case)
            }
            Err(StoreError::CaseNotFound(_)) => Err(CaseError::Conflict(format!(
                "case {case_id} is not available for assignment: not found"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a case on behalf of its owner.
    ///
    /// Analyzes the transcript (unless a result already exists), writes the
    /// result, then flips the status with the user-resolution timestamp. An
    /// analysis failure or timeout leaves the case untouched.
    #[instrument(skip(self))]
    pub async fn resolve_by_user(&self, case_id: CaseId, user_id: UserId) -> Result<Case, CaseError> {
        let case = self.get(case_id).await?;
        if case.user_id != user_id {
            return Err(CaseError::Forbidden(format!(
                "case {case_id} belongs to another user"
            )));
        }
        if case.is_resolved() {
            return Err(CaseError::Conflict(format!("case {case_id} is already resolved")));
        }

        self.ensure_result(&case, ResolvedBy::User).await?;
        let resolved = self
            .store
            .update_case_status(case_id, CaseTransition::Resolve { by: ResolvedBy::User })
            .await?;
        info!(case_id, "case resolved by user");
        Ok(resolved)
    }

    /// Resolve a case on behalf of the system.
    ///
    /// If the case already has a result (the sweeper writes a synthetic one
    /// first) only the status and system timestamp change.
    #[instrument(skip(self))]
    pub async fn resolve_by_system(&self, case_id: CaseId) -> Result<Case, CaseError> {
        let case = self.get(case_id).await?;
        if case.is_resolved() {
            return Err(CaseError::Conflict(format!("case {case_id} is already resolved")));
        }

        self.ensure_result(&case, ResolvedBy::System).await?;
        let resolved = self
            .store
            .update_case_status(case_id, CaseTransition::Resolve { by: ResolvedBy::System })
            .await?;
        info!(case_id, "case resolved by system");
        Ok(resolved)
    }

    /// Make sure `case` has an analysis result, analyzing its transcript if
    /// needed.
    async fn ensure_result(
        &self,
        case: &Case,
        resolved_by: ResolvedBy,
    ) -> Result<AnalysisResult, CaseError> {
        if let Some(existing) = self.store.get_analysis_result(case.id).await? {
            debug!(case_id = case.id, "reusing existing analysis result");
            return Ok(existing);
        }

        let messages = self.store.list_messages(case.id).await?;
        let analysis = self
            .analyze_resolution(&messages, case.category, resolved_by)
            .await
            .inspect_err(|e| warn!(case_id = case.id, error = %e, "resolution analysis failed"))?;
        Ok(self.store.create_analysis_result(case.id, analysis).await?)
    }

    async fn analyze_resolution(
        &self,
        messages: &[Message],
        category: Option<Category>,
        resolved_by: ResolvedBy,
    ) -> Result<ResolutionAnalysis, AnalysisError> {
        tokio::time::timeout(
            self.analysis_timeout,
            self.analysis.analyze_resolution(messages, category, resolved_by),
        )
        .await
        .map_err(|_| AnalysisError::Timeout(self.analysis_timeout))?
    }

    /// Cases visible to `who`: a user's own cases, or the staff inbox
    /// (OPEN unless another status is asked for).
    pub async fn list_for(
        &self,
        who: &Identity,
        status: Option<CaseStatus>,
    ) -> Result<Vec<CaseDetails>, CaseError> {
        let filter = match who.role {
            Role::User => CaseFilter {
                user_id: Some(who.user_id),
                status,
                limit: None,
            },
            Role::Agent | Role::LeadAgent => CaseFilter {
                user_id: None,
                status: Some(status.unwrap_or(CaseStatus::Open)),
                limit: None,
            },
        };
        let cases = self.store.list_cases(filter).await?;
        let mut details = Vec::with_capacity(cases.len());
        for case in cases {
            details.push(self.load_details(case).await?);
        }
        Ok(details)
    }

    /// A case with transcript and result. Users may only read their own.
    pub async fn details_for(&self, who: &Identity, case_id: CaseId) -> Result<CaseDetails, CaseError> {
        let case = self.get(case_id).await?;
        if who.role == Role::User && case.user_id != who.user_id {
            return Err(CaseError::Forbidden(format!(
                "case {case_id} belongs to another user"
            )));
        }
        self.load_details(case).await
    }

    async fn load_details(&self, case: Case) -> Result<CaseDetails, CaseError> {
        let messages = self.store.list_messages(case.id).await?;
        let result = self.store.get_analysis_result(case.id).await?;
        Ok(CaseDetails {
            case,
            messages,
            result,
        })
    }

    /// Summarize selected messages of a case (all of them when `selected`
    /// is `None`) and draft replies. Nothing is persisted.
    #[instrument(skip(self, selected), fields(selected = selected.as_ref().map(Vec::len)))]
    pub async fn summarize(
        &self,
        who: &Identity,
        case_id: CaseId,
        selected: Option<Vec<MessageId>>,
    ) -> Result<ConversationSummary, CaseError> {
        if !who.role.is_staff() {
            return Err(CaseError::Forbidden("only agents can summarize".into()));
        }
        let case = self.get(case_id).await?;
        if !case.grants_room_access(who) {
            return Err(CaseError::Forbidden(format!(
                "case {case_id} is not assigned to you"
            )));
        }

        let mut messages = self.store.list_messages(case_id).await?;
        if let Some(ids) = selected {
            if let Some(missing) = ids.iter().find(|id| !messages.iter().any(|m| m.id == **id)) {
                return Err(CaseError::NotFound(format!(
                    "message {missing} not found in case {case_id}"
                )));
            }
            messages.retain(|m| ids.contains(&m.id));
        }
        if messages.is_empty() {
            return Err(CaseError::Validation("no messages to summarize".into()));
        }

        let summary = tokio::time::timeout(
            self.analysis_timeout,
            self.analysis.summarize(&messages, case.category),
        )
        .await
        .map_err(|_| AnalysisError::Timeout(self.analysis_timeout))??;
        Ok(summary)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
