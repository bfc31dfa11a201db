//! Case repository: creation, lookups, and the conditional status updates
//! that implement the lifecycle transitions.
//!
//! Transitions are single `UPDATE … WHERE` statements whose condition is the
//! expected prior state. A return of `0` changed rows means the precondition
//! did not hold; the caller re-reads the row to report why.

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::errors::Result;
use crate::sqlite::row_types::CaseRow;

/// Options for listing cases.
#[derive(Default)]
pub struct ListCasesOptions<'a> {
    /// Only cases owned by this user.
    pub user_id: Option<i64>,
    /// Only cases in this status.
    pub status: Option<&'a str>,
    /// Maximum results.
    pub limit: Option<i64>,
}

/// Which resolution timestamp a resolve writes.
#[derive(Clone, Copy, Debug)]
pub enum ResolutionColumn {
    /// `system_resolved_at`.
    System,
    /// `user_resolved_at`.
    User,
}

impl ResolutionColumn {
    fn name(self) -> &'static str {
        match self {
            Self::System => "system_resolved_at",
            Self::User => "user_resolved_at",
        }
    }
}

/// Case repository: stateless, every method takes `&Connection`.
pub struct CaseRepo;

impl CaseRepo {
    /// Insert a new OPEN, unassigned case.
    pub fn create(
        conn: &Connection,
        user_id: i64,
        category: &str,
        priority: i64,
        created_at: &str,
    ) -> Result<CaseRow> {
        let row = conn.query_row(
            "INSERT INTO cases (user_id, status, category, priority, created_at)
             VALUES (?1, 'OPEN', ?2, ?3, ?4)
             RETURNING *",
            params![user_id, category, priority, created_at],
            Self::map_row,
        )?;
        Ok(row)
    }

    /// Get case by ID.
    pub fn get_by_id(conn: &Connection, case_id: i64) -> Result<Option<CaseRow>> {
        let row = conn
            .query_row(
                "SELECT * FROM cases WHERE id = ?1",
                params![case_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List cases, oldest first.
    pub fn list(conn: &Connection, opts: &ListCasesOptions<'_>) -> Result<Vec<CaseRow>> {
        use std::fmt::Write;
        let mut sql = String::from("SELECT * FROM cases WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(user_id) = opts.user_id {
            let _ = write!(sql, " AND user_id = ?{}", param_values.len() + 1);
            param_values.push(Box::new(user_id));
        }
        if let Some(status) = opts.status {
            let _ = write!(sql, " AND status = ?{}", param_values.len() + 1);
            param_values.push(Box::new(status.to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        if let Some(limit) = opts.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Assign an agent and move OPEN → `IN_PROGRESS`, only if the case is
    /// still OPEN and unassigned. Returns whether the row changed.
    pub fn assign(conn: &Connection, case_id: i64, agent_id: i64) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE cases SET assigned_agent_id = ?1, status = 'IN_PROGRESS'
             WHERE id = ?2 AND status = 'OPEN' AND assigned_agent_id IS NULL",
            params![agent_id, case_id],
        )?;
        Ok(changed > 0)
    }

    /// Move an unresolved case to RESOLVED, stamping one resolution column,
    /// only if its analysis result already exists. Returns whether the row
    /// changed.
    pub fn resolve(
        conn: &Connection,
        case_id: i64,
        column: ResolutionColumn,
        resolved_at: &str,
    ) -> Result<bool> {
        let sql = format!(
            "UPDATE cases SET status = 'RESOLVED', {} = ?1
             WHERE id = ?2
               AND status IN ('OPEN', 'IN_PROGRESS')
               AND EXISTS (SELECT 1 FROM analysis_results WHERE case_id = ?2)",
            column.name()
        );
        let changed = conn.execute(&sql, params![resolved_at, case_id])?;
        Ok(changed > 0)
    }

    /// Cases in one of `statuses` created strictly before `older_than`.
    pub fn find_stale(
        conn: &Connection,
        statuses: &[&str],
        older_than: &str,
    ) -> Result<Vec<CaseRow>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (2..=statuses.len() + 1).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT * FROM cases WHERE created_at < ?1 AND status IN ({})
             ORDER BY created_at ASC, id ASC",
            placeholders.join(", ")
        );
        let mut values: Vec<&dyn rusqlite::types::ToSql> = vec![&older_than];
        for status in statuses {
            values.push(status);
        }
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Cases created or resolved at or after `since`.
    pub fn touched_since(conn: &Connection, since: &str) -> Result<Vec<CaseRow>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM cases
             WHERE created_at >= ?1 OR system_resolved_at >= ?1 OR user_resolved_at >= ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![since], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaseRow> {
        Ok(CaseRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            assigned_agent_id: row.get("assigned_agent_id")?,
            status: row.get("status")?,
            category: row.get("category")?,
            priority: row.get("priority")?,
            created_at: row.get("created_at")?,
            system_resolved_at: row.get("system_resolved_at")?,
            user_resolved_at: row.get("user_resolved_at")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
