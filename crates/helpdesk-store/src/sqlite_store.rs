//! [`CaseStore`] over the `SQLite` pool.
//!
//! Repository calls are synchronous, so each store operation runs on the
//! blocking thread pool with its own pooled connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_core::{
    AnalysisResult, Case, CaseId, CaseStatus, Category, Message, MessageId, ResolutionAnalysis,
    ResolvedBy, UserId, time,
};
use helpdesk_settings::DatabaseSettings;
use rusqlite::Connection;
use tracing::{debug, instrument};

use crate::errors::{Result, StoreError};
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool};
use crate::sqlite::migrations::run_migrations;
use crate::sqlite::repositories::case::ResolutionColumn;
use crate::sqlite::repositories::{AnalysisResultRepo, CaseRepo, ListCasesOptions, MessageRepo};
use crate::sqlite::row_types::CaseRow;
use crate::store::{
    CaseFilter, CaseStore, CaseTransition, NewMessage, SentimentCounts, StaleCase,
};

/// `SQLite`-backed case store.
#[derive(Clone)]
pub struct SqliteCaseStore {
    pool: ConnectionPool,
}

impl SqliteCaseStore {
    /// Wrap an existing pool. The schema must already be migrated.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open the configured database and bring its schema up to date.
    pub fn open(settings: &DatabaseSettings) -> Result<Self> {
        let pool = connection::open(settings)?;
        let applied = run_migrations(&*pool.get()?)?;
        debug!(applied, in_memory = settings.is_in_memory(), "case store opened");
        Ok(Self::new(pool))
    }

    /// A migrated private in-memory store.
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        let _ = run_migrations(&*pool.get()?)?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("store task failed: {e}")))?
    }
}

fn load_case(conn: &Connection, case_id: CaseId) -> Result<Option<Case>> {
    CaseRepo::get_by_id(conn, case_id)?
        .map(Case::try_from)
        .transpose()
}

fn load_messages(conn: &Connection, case_id: CaseId) -> Result<Vec<Message>> {
    MessageRepo::list_by_case(conn, case_id)?
        .into_iter()
        .map(Message::try_from)
        .collect()
}

fn load_result(conn: &Connection, case_id: CaseId) -> Result<Option<AnalysisResult>> {
    AnalysisResultRepo::get_by_case(conn, case_id)?
        .map(AnalysisResult::try_from)
        .transpose()
}

fn into_cases(rows: Vec<CaseRow>) -> Result<Vec<Case>> {
    rows.into_iter().map(Case::try_from).collect()
}

/// Why a transition's precondition failed, given the row as it is now.
fn transition_conflict(case: &Case, transition: CaseTransition) -> StoreError {
    let id = case.id;
    let reason = match (transition, case.status) {
        (_, CaseStatus::Resolved) => format!("case {id} is already resolved"),
        (CaseTransition::Assign { .. }, _) if case.assigned_agent_id.is_some() => {
            format!("case {id} is already assigned")
        }
        (CaseTransition::Assign { .. }, status) => {
            format!("case {id} is {status}, not OPEN")
        }
        (CaseTransition::Resolve { .. }, _) => {
            format!("case {id} has no analysis result")
        }
    };
    StoreError::Conflict(reason)
}

fn apply_transition(
    conn: &Connection,
    case_id: CaseId,
    transition: CaseTransition,
) -> Result<Case> {
    let tx = conn.unchecked_transaction()?;
    let changed = match transition {
        CaseTransition::Assign { agent_id } => CaseRepo::assign(&tx, case_id, agent_id)?,
        CaseTransition::Resolve { by } => {
            let column = match by {
                ResolvedBy::User => ResolutionColumn::User,
                ResolvedBy::System => ResolutionColumn::System,
            };
            CaseRepo::resolve(&tx, case_id, column, &time::now_encoded())?
        }
    };
    let case = load_case(&tx, case_id)?.ok_or(StoreError::CaseNotFound(case_id))?;
    if !changed {
        return Err(transition_conflict(&case, transition));
    }
    tx.commit()?;
    Ok(case)
}

#[async_trait]
impl CaseStore for SqliteCaseStore {
    async fn get_case(&self, case_id: CaseId) -> Result<Option<Case>> {
        self.with_conn(move |conn| load_case(conn, case_id)).await
    }

    #[instrument(skip(self))]
    async fn create_case(&self, owner: UserId, category: Category, priority: u8) -> Result<Case> {
        self.with_conn(move |conn| {
            let row = CaseRepo::create(
                conn,
                owner,
                category.as_str(),
                i64::from(priority),
                &time::now_encoded(),
            )?;
            Case::try_from(row)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn update_case_status(&self, case_id: CaseId, transition: CaseTransition) -> Result<Case> {
        self.with_conn(move |conn| apply_transition(conn, case_id, transition))
            .await
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message> {
        self.with_conn(move |conn| {
            let case_id = message.case_id;
            let inserted = MessageRepo::create(
                conn,
                case_id,
                message.sender_id,
                message.sender_role.as_str(),
                &message.content,
                &time::now_encoded(),
            )?;
            match inserted {
                Some(row) => Message::try_from(row),
                None if CaseRepo::get_by_id(conn, case_id)?.is_none() => {
                    Err(StoreError::CaseNotFound(case_id))
                }
                None => Err(StoreError::Conflict(format!(
                    "case {case_id} is resolved and accepts no messages"
                ))),
            }
        })
        .await
    }

    async fn get_message(&self, message_id: MessageId) -> Result<Option<Message>> {
        self.with_conn(move |conn| {
            MessageRepo::get_by_id(conn, message_id)?
                .map(Message::try_from)
                .transpose()
        })
        .await
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<()> {
        self.with_conn(move |conn| {
            if MessageRepo::delete(conn, message_id)? {
                Ok(())
            } else {
                Err(StoreError::MessageNotFound(message_id))
            }
        })
        .await
    }

    async fn list_messages(&self, case_id: CaseId) -> Result<Vec<Message>> {
        self.with_conn(move |conn| load_messages(conn, case_id)).await
    }

    async fn delete_messages_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let cutoff = time::encode(cutoff);
        self.with_conn(move |conn| {
            let deleted = MessageRepo::delete_older_than(conn, &cutoff)?;
            Ok(deleted as u64)
        })
        .await
    }

    async fn create_analysis_result(
        &self,
        case_id: CaseId,
        analysis: ResolutionAnalysis,
    ) -> Result<AnalysisResult> {
        self.with_conn(move |conn| {
            if CaseRepo::get_by_id(conn, case_id)?.is_none() {
                return Err(StoreError::CaseNotFound(case_id));
            }
            let (row, created) = AnalysisResultRepo::insert_or_get(
                conn,
                case_id,
                Some(&analysis.classification),
                Some(&analysis.summary),
                Some(analysis.sentiment.as_str()),
                &time::now_encoded(),
            )?;
            if !created {
                debug!(case_id, "analysis result already present, keeping it");
            }
            AnalysisResult::try_from(row)
        })
        .await
    }

    async fn get_analysis_result(&self, case_id: CaseId) -> Result<Option<AnalysisResult>> {
        self.with_conn(move |conn| load_result(conn, case_id)).await
    }

    async fn find_stale_cases(
        &self,
        statuses: &[CaseStatus],
        older_than: DateTime<Utc>,
    ) -> Result<Vec<StaleCase>> {
        let statuses: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();
        let older_than = time::encode(older_than);
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let rows = CaseRepo::find_stale(&tx, &statuses, &older_than)?;
            let mut stale = Vec::with_capacity(rows.len());
            for row in rows {
                let case = Case::try_from(row)?;
                stale.push(StaleCase {
                    messages: load_messages(&tx, case.id)?,
                    result: load_result(&tx, case.id)?,
                    case,
                });
            }
            tx.commit()?;
            Ok(stale)
        })
        .await
    }

    async fn list_cases(&self, filter: CaseFilter) -> Result<Vec<Case>> {
        self.with_conn(move |conn| {
            let rows = CaseRepo::list(
                conn,
                &ListCasesOptions {
                    user_id: filter.user_id,
                    status: filter.status.map(CaseStatus::as_str),
                    limit: filter.limit.map(i64::from),
                },
            )?;
            into_cases(rows)
        })
        .await
    }

    async fn cases_touched_since(&self, since: DateTime<Utc>) -> Result<Vec<Case>> {
        let since = time::encode(since);
        self.with_conn(move |conn| into_cases(CaseRepo::touched_since(conn, &since)?))
            .await
    }

    async fn sentiment_counts(&self) -> Result<SentimentCounts> {
        self.with_conn(|conn| {
            let mut counts = SentimentCounts::default();
            for (sentiment, n) in AnalysisResultRepo::sentiment_tally(conn)? {
                let n = u64::try_from(n).unwrap_or(0);
                match sentiment.as_deref() {
                    Some("POSITIVE") => counts.positive += n,
                    Some("NEUTRAL") => counts.neutral += n,
                    Some("NEGATIVE") => counts.negative += n,
                    _ => counts.unknown += n,
                }
            }
            Ok(counts)
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
