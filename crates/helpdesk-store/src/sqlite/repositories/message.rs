//! Message repository.
//!
//! A message's `created_at` is never earlier than the newest message already
//! stored for the same case, so ordering by `(created_at, id)` matches
//! insertion order even if the wall clock steps backwards.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::MessageRow;

/// Message repository: stateless, every method takes `&Connection`.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message unless its case is missing or RESOLVED, in which
    /// case nothing is written and `None` comes back. The status check and
    /// the insert are one statement, so a resolution cannot land between
    /// them.
    pub fn create(
        conn: &Connection,
        case_id: i64,
        sender_id: i64,
        sender_role: &str,
        content: &str,
        now: &str,
    ) -> Result<Option<MessageRow>> {
        let row = conn
            .query_row(
                "INSERT INTO messages (case_id, sender_id, sender_role, content, created_at)
                 SELECT ?1, ?2, ?3, ?4,
                        MAX(?5, COALESCE((SELECT MAX(created_at) FROM messages WHERE case_id = ?1), ''))
                 WHERE EXISTS (SELECT 1 FROM cases WHERE id = ?1 AND status <> 'RESOLVED')
                 RETURNING *",
                params![case_id, sender_id, sender_role, content, now],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get message by ID.
    pub fn get_by_id(conn: &Connection, message_id: i64) -> Result<Option<MessageRow>> {
        let row = conn
            .query_row(
                "SELECT * FROM messages WHERE id = ?1",
                params![message_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Delete a message. Returns whether it existed.
    pub fn delete(conn: &Connection, message_id: i64) -> Result<bool> {
        let changed = conn.execute("DELETE FROM messages WHERE id = ?1", params![message_id])?;
        Ok(changed > 0)
    }

    /// All messages of a case in creation order.
    pub fn list_by_case(conn: &Connection, case_id: i64) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM messages WHERE case_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![case_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete every message created strictly before `cutoff`.
    pub fn delete_older_than(conn: &Connection, cutoff: &str) -> Result<usize> {
        let deleted = conn.execute("DELETE FROM messages WHERE created_at < ?1", params![cutoff])?;
        Ok(deleted)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
        Ok(MessageRow {
            id: row.get("id")?,
            case_id: row.get("case_id")?,
            sender_id: row.get("sender_id")?,
            sender_role: row.get("sender_role")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
        })
    }
}
