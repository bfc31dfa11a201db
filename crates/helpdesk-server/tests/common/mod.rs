//! Shared boot helpers for the end-to-end tests.

#![allow(dead_code, unused_results)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use helpdesk_analysis::{AnalysisError, AnalysisService};
use helpdesk_auth::JwtAuthenticator;
use helpdesk_core::{
    Category, ConversationSummary, Identity, Message, ResolutionAnalysis, ResolvedBy, Role,
    Sentiment,
};
use helpdesk_runtime::CaseLifecycle;
use helpdesk_server::{HelpdeskServer, ServerConfig};
use helpdesk_store::{CaseStore, SqliteCaseStore};

pub const SECRET: &str = "integration-secret";
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Analysis double: fixed sentiment, counts calls.
#[derive(Default)]
pub struct CountingAnalysis {
    pub calls: AtomicUsize,
}

impl CountingAnalysis {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for CountingAnalysis {
    async fn summarize(
        &self,
        messages: &[Message],
        _category: Option<Category>,
    ) -> Result<ConversationSummary, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ConversationSummary {
            summary: format!("{} messages", messages.len()),
            suggested_responses: ["a".into(), "b".into(), "c".into()],
        })
    }

    async fn analyze_resolution(
        &self,
        messages: &[Message],
        _category: Option<Category>,
        resolved_by: ResolvedBy,
    ) -> Result<ResolutionAnalysis, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ResolutionAnalysis {
            classification: "billing".into(),
            summary: format!("{} messages, resolved by {resolved_by}", messages.len()),
            sentiment: Sentiment::Positive,
        })
    }
}

pub struct TestApp {
    pub server: HelpdeskServer,
    pub store: Arc<SqliteCaseStore>,
    pub analysis: Arc<CountingAnalysis>,
    pub auth: JwtAuthenticator,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let store = Arc::new(SqliteCaseStore::in_memory().unwrap());
        let analysis = Arc::new(CountingAnalysis::default());
        let lifecycle = Arc::new(CaseLifecycle::new(
            store.clone(),
            analysis.clone(),
            Duration::from_secs(2),
        ));
        let server = HelpdeskServer::new(config, lifecycle, Arc::new(JwtAuthenticator::new(SECRET)));
        Self {
            server,
            store,
            analysis,
            auth: JwtAuthenticator::new(SECRET),
        }
    }

    pub fn token(&self, user_id: i64, role: Role) -> String {
        self.auth.issue(Identity::new(user_id, role), None).unwrap()
    }

    pub async fn listen(&self) -> SocketAddr {
        let (addr, _handle) = self.server.listen().await.unwrap();
        addr
    }

    pub async fn open_case(&self, owner: i64) -> helpdesk_core::Case {
        self.store.create_case(owner, Category::Bug, 3).await.unwrap()
    }
}
