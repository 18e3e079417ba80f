//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The ledger service calls table methods; it never executes SQL directly.
//!
//! Every read runs inside one transaction so it sees a consistent snapshot.
//! Every write runs inside one IMMEDIATE transaction: the closure either
//! returns Ok and everything commits, or returns Err and nothing does.

mod balance;
mod history;
mod match_result;

use crate::{
    error::LedgerResult,
    types::{Actor, EntryId, MatchNumber, Points},
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One row of the balance table, in leaderboard form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub actor: Actor,
    pub points: Points,
}

/// One point change. Immutable once written; only undo deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub actor: Actor,
    pub delta: Points,
    pub match_number: Option<MatchNumber>,
    pub recorded_by: Actor,
    pub recorded_at: DateTime<Utc>,
}

/// The decided winner of a match: a projection of the newest surviving
/// history entry that carries this match number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_number: MatchNumber,
    pub winner: Actor,
    pub entry_id: EntryId,
    pub recorded_by: Actor,
    pub recorded_at: DateTime<Utc>,
}

pub struct LedgerStore {
    conn: Mutex<Connection>,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl LedgerStore {
    /// Open (or create) the ledger database at `path`.
    /// `busy_timeout` bounds how long a write waits on a locked file.
    pub fn open(path: &str, busy_timeout: Duration) -> LedgerResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        let conn = Connection::open(path)?;
        // WAL mode: readers don't block the writer.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(busy_timeout)?;
        log::info!("Opened ledger store at {path}");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Open a second handle on the same database file.
    /// An in-memory store reopens as a fresh, empty database.
    pub fn reopen(&self, busy_timeout: Duration) -> LedgerResult<Self> {
        match &self.path {
            Some(p) => Self::open(p, busy_timeout),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LedgerResult<()> {
        self.conn
            .lock()
            .execute_batch(include_str!("../../../migrations/001_ledger.sql"))?;
        Ok(())
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Run `f` against a consistent snapshot of all three tables.
    pub(crate) fn read<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Tables<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut conn = self.conn.lock();
        in_transaction(&mut conn, TransactionBehavior::Deferred, f).map_err(|e| e.during(op))
    }

    /// Run `f` as one all-or-nothing unit of work.
    ///
    /// The store lock plus the IMMEDIATE transaction serialise every
    /// mutation, so the commit order is the total order of operations.
    pub(crate) fn write<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Tables<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut conn = self.conn.lock();
        in_transaction(&mut conn, TransactionBehavior::Immediate, f).map_err(|e| e.during(op))
    }
}

fn in_transaction<T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    f: impl FnOnce(&Tables<'_>) -> LedgerResult<T>,
) -> LedgerResult<T> {
    let tx = conn.transaction_with_behavior(behavior)?;
    // Dropping `tx` on the error path rolls back.
    let out = f(&Tables { conn: &tx })?;
    tx.commit()?;
    Ok(out)
}

/// The three ledger tables, seen through one open transaction.
pub(crate) struct Tables<'a> {
    conn: &'a Connection,
}

#[cfg(test)]
pub(crate) fn test_store() -> LedgerStore {
    let store = LedgerStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[cfg(test)]
mod tests {
    use super::test_store;
    use crate::error::LedgerError;
    use chrono::Utc;

    fn counts(store: &super::LedgerStore) -> (i64, usize, usize) {
        store
            .read("test", |t| {
                Ok((
                    t.get_balance("alice")?,
                    t.list_history()?.len(),
                    t.list_match_results()?.len(),
                ))
            })
            .unwrap()
    }

    #[test]
    fn failed_write_after_award_steps_rolls_back() {
        let store = test_store();
        let now = Utc::now();
        let err = store
            .write("award", |t| {
                t.apply_delta("alice", 3)?;
                t.append_history("alice", 3, Some(8), "sys", now)?;
                let entry = t.latest_entry()?.unwrap();
                t.upsert_match_result(&entry)?;
                Err::<(), _>(LedgerError::NotFound("injected".into()))
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert_eq!(counts(&store), (0, 0, 0), "partial award survived a failed transaction");
    }

    #[test]
    fn failed_write_after_undo_steps_rolls_back() {
        let store = test_store();
        let now = Utc::now();
        store
            .write("award", |t| {
                t.apply_delta("alice", 2)?;
                t.append_history("alice", 2, Some(8), "sys", now)?;
                let entry = t.latest_entry()?.unwrap();
                t.upsert_match_result(&entry)
            })
            .unwrap();
        assert_eq!(counts(&store), (2, 1, 1));

        let err = store
            .write("undo_last", |t| {
                let entry = t.latest_entry()?.unwrap();
                t.delete_match_result(8)?;
                t.delete_entry(entry.id)?;
                t.apply_delta("alice", -entry.delta)?;
                t.remove_balance("alice")?;
                Err::<(), _>(LedgerError::NotFound("injected".into()))
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert_eq!(counts(&store), (2, 1, 1), "partial undo survived a failed transaction");
        let result = store.read("test", |t| t.get_match_result(8)).unwrap().unwrap();
        assert_eq!(result.winner, "alice");
    }

    #[test]
    fn file_store_opens_in_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let store = super::LedgerStore::open(path.to_str().unwrap(), std::time::Duration::from_millis(500)).unwrap();
        let mode: String = store
            .conn
            .lock()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
