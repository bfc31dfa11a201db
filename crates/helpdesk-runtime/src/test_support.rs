//! Fakes shared by the lifecycle, sweeper and analytics tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use helpdesk_analysis::{AnalysisError, AnalysisService};
use helpdesk_core::{
    CaseId, Category, ConversationSummary, Message, ResolutionAnalysis, ResolvedBy, SenderRole,
    Sentiment, UserId,
};
use helpdesk_store::{CaseStore, NewMessage, SqliteCaseStore};

use crate::lifecycle::CaseLifecycle;

pub(crate) enum Behavior {
    Reply(Sentiment),
    Fail,
    Hang,
}

/// Analysis service double that counts calls.
pub(crate) struct FakeAnalysis {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeAnalysis {
    pub(crate) fn replying(sentiment: Sentiment) -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Reply(sentiment),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Fail,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn hanging() -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Hang,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond<T>(&self, reply: impl FnOnce(Sentiment) -> T) -> Result<T, AnalysisError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Reply(sentiment) => Ok(reply(sentiment)),
            Behavior::Fail => Err(AnalysisError::Status {
                status: 500,
                message: "model unavailable".into(),
            }),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl AnalysisService for FakeAnalysis {
    async fn summarize(
        &self,
        messages: &[Message],
        _category: Option<Category>,
    ) -> Result<ConversationSummary, AnalysisError> {
        let n = messages.len();
        self.respond(|_| ConversationSummary {
            summary: format!("{n} messages"),
            suggested_responses: ["direct".into(), "empathetic".into(), "clarifying".into()],
        })
        .await
    }

    async fn analyze_resolution(
        &self,
        messages: &[Message],
        category: Option<Category>,
        resolved_by: ResolvedBy,
    ) -> Result<ResolutionAnalysis, AnalysisError> {
        let n = messages.len();
        self.respond(|sentiment| ResolutionAnalysis {
            classification: format!("{} issue", category.unwrap_or_default()),
            summary: format!("{n} messages, resolved by {resolved_by}"),
            sentiment,
        })
        .await
    }
}

pub(crate) const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn lifecycle(analysis: Arc<FakeAnalysis>) -> (Arc<SqliteCaseStore>, Arc<CaseLifecycle>) {
    let store = Arc::new(SqliteCaseStore::in_memory().unwrap());
    let lifecycle = Arc::new(CaseLifecycle::new(store.clone(), analysis, ANALYSIS_TIMEOUT));
    (store, lifecycle)
}

pub(crate) async fn say(
    store: &SqliteCaseStore,
    case_id: CaseId,
    sender_id: UserId,
    sender_role: SenderRole,
    content: &str,
) -> Message {
    store
        .create_message(NewMessage {
            case_id,
            sender_id,
            sender_role,
            content: content.into(),
        })
        .await
        .unwrap()
}
