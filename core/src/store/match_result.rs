use super::{HistoryEntry, MatchResult, Tables};
use crate::{error::LedgerResult, types::MatchNumber};
use rusqlite::{params, OptionalExtension, Row};

impl Tables<'_> {
    // ── Match result index ────────────────────────────────────────

    /// Point `entry.match_number` at `entry`. No-op for entries without one.
    pub(crate) fn upsert_match_result(&self, entry: &HistoryEntry) -> LedgerResult<()> {
        let Some(match_number) = entry.match_number else {
            return Ok(());
        };
        self.conn.execute(
            "INSERT INTO match_result (match_number, winner, entry_id, recorded_by, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(match_number) DO UPDATE SET
                winner      = excluded.winner,
                entry_id    = excluded.entry_id,
                recorded_by = excluded.recorded_by,
                recorded_at = excluded.recorded_at",
            params![
                match_number,
                entry.actor,
                entry.id,
                entry.recorded_by,
                entry.recorded_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_match_result(&self, match_number: MatchNumber) -> LedgerResult<Option<MatchResult>> {
        let result = self
            .conn
            .query_row(
                "SELECT match_number, winner, entry_id, recorded_by, recorded_at
                 FROM match_result WHERE match_number = ?1",
                params![match_number],
                Self::map_match_result_row,
            )
            .optional()?;
        Ok(result)
    }

    pub(crate) fn delete_match_result(&self, match_number: MatchNumber) -> LedgerResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM match_result WHERE match_number = ?1",
            params![match_number],
        )?;
        Ok(removed > 0)
    }

    /// Rebuild the index row for `match_number` from the surviving history.
    pub(crate) fn reproject_match(&self, match_number: MatchNumber) -> LedgerResult<Option<MatchResult>> {
        self.delete_match_result(match_number)?;
        if let Some(entry) = self.latest_entry_for_match(match_number)? {
            self.upsert_match_result(&entry)?;
        }
        self.get_match_result(match_number)
    }

    pub fn list_match_results(&self) -> LedgerResult<Vec<MatchResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT match_number, winner, entry_id, recorded_by, recorded_at
             FROM match_result ORDER BY match_number ASC",
        )?;
        let rows = stmt
            .query_map([], Self::map_match_result_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(crate) fn clear_match_results(&self) -> LedgerResult<usize> {
        Ok(self.conn.execute("DELETE FROM match_result", [])?)
    }

    fn map_match_result_row(row: &Row<'_>) -> rusqlite::Result<MatchResult> {
        Ok(MatchResult {
            match_number: row.get(0)?,
            winner: row.get(1)?,
            entry_id: row.get(2)?,
            recorded_by: row.get(3)?,
            recorded_at: row.get(4)?,
        })
    }
}
