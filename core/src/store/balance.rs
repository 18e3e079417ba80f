use super::{Standing, Tables};
use crate::{
    error::{ConstraintViolation, LedgerResult},
    types::{Actor, Points},
};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

impl Tables<'_> {
    // ── Balance ───────────────────────────────────────────────────

    /// Current points for `actor`; 0 if the ledger has never seen them.
    pub fn get_balance(&self, actor: &str) -> LedgerResult<Points> {
        let points = self
            .conn
            .query_row(
                "SELECT points FROM balance WHERE actor = ?1",
                params![actor],
                |row| row.get::<_, Points>(0),
            )
            .optional()?;
        Ok(points.unwrap_or(0))
    }

    pub fn get_all_balances(&self) -> LedgerResult<HashMap<Actor, Points>> {
        let mut stmt = self.conn.prepare("SELECT actor, points FROM balance")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    /// Every balance, highest first. Ties keep first-seen order.
    pub fn standings(&self) -> LedgerResult<Vec<Standing>> {
        let mut stmt = self
            .conn
            .prepare("SELECT actor, points FROM balance ORDER BY points DESC, seq ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Standing {
                    actor: row.get(0)?,
                    points: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Create the row at 0 if absent, then add `delta`.
    /// Refuses to take a balance below zero.
    pub(crate) fn apply_delta(&self, actor: &str, delta: Points) -> LedgerResult<Points> {
        let balance = self.get_balance(actor)?;
        let next = balance.saturating_add(delta);
        if next < 0 {
            return Err(ConstraintViolation::NegativeBalance {
                actor: actor.to_string(),
                balance,
                delta,
            }
            .into());
        }
        self.conn.execute(
            "INSERT INTO balance (actor, points) VALUES (?1, ?2)
             ON CONFLICT(actor) DO UPDATE SET points = excluded.points",
            params![actor, next],
        )?;
        Ok(next)
    }

    /// Drop the row entirely, so a later award counts as first-seen again.
    pub(crate) fn remove_balance(&self, actor: &str) -> LedgerResult<()> {
        self.conn
            .execute("DELETE FROM balance WHERE actor = ?1", params![actor])?;
        Ok(())
    }

    pub(crate) fn clear_balances(&self) -> LedgerResult<usize> {
        Ok(self.conn.execute("DELETE FROM balance", [])?)
    }
}
