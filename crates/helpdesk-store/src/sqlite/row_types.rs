//! Raw database rows and their conversion into domain types.
//!
//! Rows keep the storage shape (text enums, text timestamps). Conversion
//! into [`Case`], [`Message`] and [`AnalysisResult`] validates every field;
//! a value that does not parse is reported as [`StoreError::Corrupt`].

use chrono::{DateTime, Utc};
use helpdesk_core::{AnalysisResult, Case, Message, time};

use crate::errors::{Result, StoreError};

/// Raw row from the `cases` table.
#[derive(Clone, Debug)]
pub struct CaseRow {
    /// Case ID.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Assigned agent.
    pub assigned_agent_id: Option<i64>,
    /// Status text.
    pub status: String,
    /// Category text.
    pub category: Option<String>,
    /// Priority 1–5.
    pub priority: Option<i64>,
    /// Creation timestamp.
    pub created_at: String,
    /// Sweeper resolution timestamp.
    pub system_resolved_at: Option<String>,
    /// Owner resolution timestamp.
    pub user_resolved_at: Option<String>,
}

/// Raw row from the `messages` table.
#[derive(Clone, Debug)]
pub struct MessageRow {
    /// Message ID.
    pub id: i64,
    /// Owning case.
    pub case_id: i64,
    /// Author.
    pub sender_id: i64,
    /// Sender role text.
    pub sender_role: String,
    /// Content.
    pub content: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Raw row from the `analysis_results` table.
#[derive(Clone, Debug)]
pub struct AnalysisResultRow {
    /// Result ID.
    pub id: i64,
    /// Owning case.
    pub case_id: i64,
    /// Classification.
    pub classification: Option<String>,
    /// Summary.
    pub summary: Option<String>,
    /// Sentiment text.
    pub sentiment: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Update timestamp.
    pub updated_at: String,
}

fn ts(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    time::decode(raw).map_err(|e| StoreError::Corrupt(format!("{field} {raw:?}: {e}")))
}

fn opt_ts(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|r| ts(field, r)).transpose()
}

fn parse<T>(raw: &str) -> Result<T>
where
    T: std::str::FromStr<Err = helpdesk_core::errors::ParseEnumError>,
{
    raw.parse().map_err(|e: helpdesk_core::errors::ParseEnumError| StoreError::Corrupt(e.to_string()))
}

impl TryFrom<CaseRow> for Case {
    type Error = StoreError;

    fn try_from(row: CaseRow) -> Result<Self> {
        let priority = row
            .priority
            .map(|p| u8::try_from(p).map_err(|_| StoreError::Corrupt(format!("priority {p}"))))
            .transpose()?;
        Ok(Case {
            id: row.id,
            user_id: row.user_id,
            assigned_agent_id: row.assigned_agent_id,
            status: parse(&row.status)?,
            category: row.category.as_deref().map(parse).transpose()?,
            priority,
            created_at: ts("created_at", &row.created_at)?,
            system_resolved_at: opt_ts("system_resolved_at", row.system_resolved_at.as_deref())?,
            user_resolved_at: opt_ts("user_resolved_at", row.user_resolved_at.as_deref())?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: row.id,
            case_id: row.case_id,
            sender_id: row.sender_id,
            sender_role: parse(&row.sender_role)?,
            content: row.content,
            created_at: ts("created_at", &row.created_at)?,
        })
    }
}

impl TryFrom<AnalysisResultRow> for AnalysisResult {
    type Error = StoreError;

    fn try_from(row: AnalysisResultRow) -> Result<Self> {
        Ok(AnalysisResult {
            id: row.id,
            case_id: row.case_id,
            classification: row.classification,
            summary: row.summary,
            sentiment: row.sentiment.as_deref().map(parse).transpose()?,
            created_at: ts("created_at", &row.created_at)?,
            updated_at: ts("updated_at", &row.updated_at)?,
        })
    }
}
