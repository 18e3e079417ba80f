use super::{HistoryEntry, Tables};
use crate::{
    error::{LedgerError, LedgerResult},
    types::{Actor, EntryId, MatchNumber, Points},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;

const ENTRY_COLUMNS: &str = "id, actor, delta, match_number, recorded_by, recorded_at";

impl Tables<'_> {
    // ── History log ───────────────────────────────────────────────

    pub(crate) fn append_history(
        &self,
        actor: &str,
        delta: Points,
        match_number: Option<MatchNumber>,
        recorded_by: &str,
        recorded_at: DateTime<Utc>,
    ) -> LedgerResult<EntryId> {
        self.conn.execute(
            "INSERT INTO history (actor, delta, match_number, recorded_by, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![actor, delta, match_number, recorded_by, recorded_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The entry with the highest id, i.e. the one undo would reverse.
    pub fn latest_entry(&self) -> LedgerResult<Option<HistoryEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM history ORDER BY id DESC LIMIT 1"),
                [],
                Self::map_entry_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn latest_entry_for_match(
        &self,
        match_number: MatchNumber,
    ) -> LedgerResult<Option<HistoryEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM history
                     WHERE match_number = ?1 ORDER BY id DESC LIMIT 1"
                ),
                params![match_number],
                Self::map_entry_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub(crate) fn delete_entry(&self, id: EntryId) -> LedgerResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM history WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(LedgerError::NotFound(format!("history entry {id}")));
        }
        Ok(())
    }

    /// Whole log, oldest first.
    pub fn list_history(&self) -> LedgerResult<Vec<HistoryEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM history ORDER BY id ASC"))?;
        let rows = stmt
            .query_map([], Self::map_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn history_for_actor(&self, actor: &str) -> LedgerResult<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM history WHERE actor = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![actor], Self::map_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn actor_has_history(&self, actor: &str) -> LedgerResult<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM history WHERE actor = ?1)",
            params![actor],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Sum of surviving deltas per actor. Must equal the balance table.
    pub fn history_totals(&self) -> LedgerResult<HashMap<Actor, Points>> {
        let mut stmt = self
            .conn
            .prepare("SELECT actor, SUM(delta) FROM history GROUP BY actor")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    pub(crate) fn clear_history(&self) -> LedgerResult<usize> {
        Ok(self.conn.execute("DELETE FROM history", [])?)
    }

    fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
        Ok(HistoryEntry {
            id: row.get(0)?,
            actor: row.get(1)?,
            delta: row.get(2)?,
            match_number: row.get(3)?,
            recorded_by: row.get(4)?,
            recorded_at: row.get(5)?,
        })
    }
}
