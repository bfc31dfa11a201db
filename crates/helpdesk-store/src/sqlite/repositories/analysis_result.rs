//! Analysis result repository. One row per case, never updated.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{Result, StoreError};
use crate::sqlite::row_types::AnalysisResultRow;

/// Sentiment tally over all stored results. `None` counts rows with no
/// sentiment.
pub type SentimentTally = Vec<(Option<String>, i64)>;

/// Analysis result repository: stateless, every method takes `&Connection`.
pub struct AnalysisResultRepo;

impl AnalysisResultRepo {
    /// Insert the result for a case unless one exists. Returns the stored
    /// row and whether this call created it.
    pub fn insert_or_get(
        conn: &Connection,
        case_id: i64,
        classification: Option<&str>,
        summary: Option<&str>,
        sentiment: Option<&str>,
        now: &str,
    ) -> Result<(AnalysisResultRow, bool)> {
        let changed = conn.execute(
            "INSERT INTO analysis_results
               (case_id, classification, summary, sentiment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(case_id) DO NOTHING",
            params![case_id, classification, summary, sentiment, now],
        )?;
        let row = Self::get_by_case(conn, case_id)?.ok_or_else(|| {
            StoreError::Internal(format!("analysis result for case {case_id} vanished"))
        })?;
        Ok((row, changed > 0))
    }

    /// Get the result for a case.
    pub fn get_by_case(conn: &Connection, case_id: i64) -> Result<Option<AnalysisResultRow>> {
        let row = conn
            .query_row(
                "SELECT * FROM analysis_results WHERE case_id = ?1",
                params![case_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Count results grouped by sentiment.
    pub fn sentiment_tally(conn: &Connection) -> Result<SentimentTally> {
        let mut stmt = conn.prepare(
            "SELECT sentiment, COUNT(*) FROM analysis_results GROUP BY sentiment",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnalysisResultRow> {
        Ok(AnalysisResultRow {
            id: row.get("id")?,
            case_id: row.get("case_id")?,
            classification: row.get("classification")?,
            summary: row.get("summary")?,
            sentiment: row.get("sentiment")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;
    use crate::sqlite::repositories::CaseRepo;

    const NOW: &str = "2026-01-01T00:00:00.000000Z";

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn first_insert_wins() {
        let conn = setup();
        let case = CaseRepo::create(&conn, 1, "BUG", 3, NOW).unwrap();
        let (first, created) =
            AnalysisResultRepo::insert_or_get(&conn, case.id, Some("a"), Some("s1"), Some("POSITIVE"), NOW)
                .unwrap();
        assert!(created);

        let (second, created) =
            AnalysisResultRepo::insert_or_get(&conn, case.id, Some("b"), Some("s2"), Some("NEGATIVE"), NOW)
                .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.classification.as_deref(), Some("a"));
    }

    #[test]
    fn results_are_immutable() {
        let conn = setup();
        let case = CaseRepo::create(&conn, 1, "BUG", 3, NOW).unwrap();
        AnalysisResultRepo::insert_or_get(&conn, case.id, None, None, None, NOW).unwrap();
        let err = conn.execute("UPDATE analysis_results SET summary = 'x'", []);
        assert!(err.is_err());
    }

    #[test]
    fn tally_groups_by_sentiment() {
        let conn = setup();
        for sentiment in ["POSITIVE", "POSITIVE", "NEGATIVE"] {
            let case = CaseRepo::create(&conn, 1, "BUG", 3, NOW).unwrap();
            AnalysisResultRepo::insert_or_get(&conn, case.id, None, None, Some(sentiment), NOW)
                .unwrap();
        }
        let tally = AnalysisResultRepo::sentiment_tally(&conn).unwrap();
        let positive = tally
            .iter()
            .find(|(s, _)| s.as_deref() == Some("POSITIVE"))
            .map(|(_, n)| *n);
        assert_eq!(positive, Some(2));
        assert_eq!(tally.iter().map(|(_, n)| n).sum::<i64>(), 3);
    }
}
