//! The ledger service. The only writer of balances, history, and
//! match results.
//!
//! RULES:
//!   - Every mutation is one store transaction. It commits whole or not at all.
//!   - For every actor, balance == sum of that actor's surviving history deltas.
//!   - A match result always mirrors the newest surviving history entry
//!     for that match, or does not exist.
//!   - Only the newest history entry can be undone.
//!
//! Mutations are serialised by the store; their commit order is the
//! order `undo_last` walks backwards through.

use crate::{
    actor,
    clock::{TimeSource, WallClock},
    config::{LedgerLimits, StoreConfig},
    error::{ConstraintViolation, LedgerError, LedgerResult},
    event::LedgerEvent,
    outcome::{Outcome, Rejection},
    snapshot::LedgerSnapshot,
    store::{HistoryEntry, LedgerStore, MatchResult, Standing},
    types::{Actor, Authority, MatchNumber, Points},
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// A requested point change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub actor: Actor,
    pub delta: Points,
    pub match_number: Option<MatchNumber>,
    pub recorded_by: Actor,
    pub authority: Authority,
}

impl Award {
    pub fn new(
        actor: impl Into<Actor>,
        delta: Points,
        match_number: Option<MatchNumber>,
        recorded_by: impl Into<Actor>,
    ) -> Self {
        Self {
            actor: actor.into(),
            delta,
            match_number,
            recorded_by: recorded_by.into(),
            authority: Authority::Member,
        }
    }

    /// One point for winning `match_number`.
    pub fn win(actor: impl Into<Actor>, match_number: MatchNumber, recorded_by: impl Into<Actor>) -> Self {
        Self::new(actor, 1, Some(match_number), recorded_by)
    }

    pub fn by(mut self, authority: Authority) -> Self {
        self.authority = authority;
        self
    }

    pub fn by_admin(self) -> Self {
        self.by(Authority::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardReceipt {
    pub entry: HistoryEntry,
    /// The actor's balance after the award.
    pub balance: Points,
    /// Previous winner of the match, when an admin overwrote it.
    pub replaced_winner: Option<Actor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoReceipt {
    pub entry: HistoryEntry,
    /// The actor's balance after the reversal.
    pub balance: Points,
    /// Who now holds the match, if an older entry for it survives.
    pub restored_winner: Option<Actor>,
}

impl UndoReceipt {
    pub fn description(&self) -> String {
        let mut text = format!(
            "Undid {} point(s) for {}",
            self.entry.delta,
            actor::display(&self.entry.actor)
        );
        if let Some(m) = self.entry.match_number {
            text.push_str(&format!(" (Match {m})"));
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearReceipt {
    pub balances: usize,
    pub entries: usize,
    pub match_results: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorStats {
    pub actor: Actor,
    pub points: Points,
    /// Matches this actor currently holds the result for.
    pub matches_won: Vec<MatchNumber>,
    pub entries: Vec<HistoryEntry>,
}

/// A breach of a ledger invariant found by `verify_consistency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    BalanceMismatch {
        actor: Actor,
        balance: Points,
        history_total: Points,
    },
    StaleMatchResult {
        match_number: MatchNumber,
    },
}

pub struct LedgerService {
    store: LedgerStore,
    limits: LedgerLimits,
    time: Box<dyn TimeSource>,
}

impl LedgerService {
    pub fn new(store: LedgerStore, limits: LedgerLimits) -> Self {
        Self::with_time_source(store, limits, Box::new(WallClock))
    }

    pub fn with_time_source(store: LedgerStore, limits: LedgerLimits, time: Box<dyn TimeSource>) -> Self {
        Self { store, limits, time }
    }

    /// Open the configured store, migrate it, and wrap it.
    pub fn open(config: &StoreConfig, limits: LedgerLimits) -> LedgerResult<Self> {
        let store = LedgerStore::open(&config.db_path, config.timeout)?;
        store.migrate()?;
        Ok(Self::new(store, limits))
    }

    pub fn limits(&self) -> LedgerLimits {
        self.limits
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Apply one point change: balance, history, and match result
    /// together, or none of them.
    pub fn award(&self, award: &Award) -> LedgerResult<AwardReceipt> {
        let actor = self.validate(award)?;
        let now = self.time.now();

        let receipt = self
            .store
            .write("award", |t| {
                let mut replaced_winner = None;
                if let Some(m) = award.match_number {
                    if let Some(existing) = t.get_match_result(m)? {
                        if !award.authority.is_admin() {
                            return Err(ConstraintViolation::MatchAlreadyDecided {
                                match_number: m,
                                winner: existing.winner,
                            }
                            .into());
                        }
                        replaced_winner = Some(existing.winner);
                    }
                }

                let balance = t.apply_delta(&actor, award.delta)?;
                let id = t.append_history(&actor, award.delta, award.match_number, &award.recorded_by, now)?;
                let entry = HistoryEntry {
                    id,
                    actor: actor.clone(),
                    delta: award.delta,
                    match_number: award.match_number,
                    recorded_by: award.recorded_by.clone(),
                    recorded_at: now,
                };
                t.upsert_match_result(&entry)?;

                Ok(AwardReceipt { entry, balance, replaced_winner })
            })
            .inspect_err(|e| log_failure("award", e))?;

        log::info!(
            "Awarded {} point(s) to {} (match {:?}) by {}; balance now {}",
            receipt.entry.delta,
            receipt.entry.actor,
            receipt.entry.match_number,
            receipt.entry.recorded_by,
            receipt.balance
        );
        LedgerEvent::PointsAwarded {
            entry_id: receipt.entry.id,
            actor: receipt.entry.actor.clone(),
            delta: receipt.entry.delta,
            match_number: receipt.entry.match_number,
            recorded_by: receipt.entry.recorded_by.clone(),
            balance: receipt.balance,
            replaced_winner: receipt.replaced_winner.clone(),
        }
        .emit();
        Ok(receipt)
    }

    /// Reverse the newest history entry. An empty log is a rejection,
    /// not an error.
    pub fn undo_last(&self) -> LedgerResult<Outcome<UndoReceipt>> {
        let outcome = self
            .store
            .write("undo_last", |t| {
                let Some(entry) = t.latest_entry()? else {
                    return Ok(Outcome::Rejected(Rejection::NothingToUndo));
                };

                // The index row references the entry; drop it first.
                if let Some(m) = entry.match_number {
                    t.delete_match_result(m)?;
                }
                t.delete_entry(entry.id)?;
                let balance = t.apply_delta(&entry.actor, -entry.delta)?;
                if balance == 0 && !t.actor_has_history(&entry.actor)? {
                    t.remove_balance(&entry.actor)?;
                }
                let restored_winner = match entry.match_number {
                    Some(m) => t.reproject_match(m)?.map(|r| r.winner),
                    None => None,
                };

                Ok(Outcome::Done(UndoReceipt { entry, balance, restored_winner }))
            })
            .inspect_err(|e| log_failure("undo_last", e))?;

        match &outcome {
            Outcome::Done(receipt) => {
                log::info!("{}; balance now {}", receipt.description(), receipt.balance);
                LedgerEvent::AwardUndone {
                    entry_id: receipt.entry.id,
                    actor: receipt.entry.actor.clone(),
                    delta: receipt.entry.delta,
                    match_number: receipt.entry.match_number,
                    balance: receipt.balance,
                    restored_winner: receipt.restored_winner.clone(),
                }
                .emit();
            }
            Outcome::Rejected(reason) => log::debug!("undo_last: {reason}"),
        }
        Ok(outcome)
    }

    /// Empty all three tables. Irreversible.
    pub fn clear_all(&self) -> LedgerResult<ClearReceipt> {
        let receipt = self
            .store
            .write("clear_all", |t| {
                let match_results = t.clear_match_results()?;
                let entries = t.clear_history()?;
                let balances = t.clear_balances()?;
                Ok(ClearReceipt { balances, entries, match_results })
            })
            .inspect_err(|e| log_failure("clear_all", e))?;

        log::warn!(
            "Ledger cleared: {} balance(s), {} history entr(ies), {} match result(s)",
            receipt.balances,
            receipt.entries,
            receipt.match_results
        );
        LedgerEvent::LedgerCleared {
            balances: receipt.balances,
            entries: receipt.entries,
            match_results: receipt.match_results,
        }
        .emit();
        Ok(receipt)
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn get_balance(&self, actor: &str) -> LedgerResult<Points> {
        let actor = actor::canonical(actor);
        self.store.read("get_balance", |t| t.get_balance(&actor))
    }

    pub fn get_all_balances(&self) -> LedgerResult<HashMap<Actor, Points>> {
        self.store.read("get_all_balances", |t| t.get_all_balances())
    }

    /// Highest first; ties in first-seen order.
    pub fn get_leaderboard(&self) -> LedgerResult<Vec<Standing>> {
        self.store.read("get_leaderboard", |t| t.standings())
    }

    /// The log oldest first, optionally for one actor.
    pub fn get_history(&self, actor: Option<&str>) -> LedgerResult<Vec<HistoryEntry>> {
        match actor {
            Some(a) => {
                let a = actor::canonical(a);
                self.store.read("get_history", |t| t.history_for_actor(&a))
            }
            None => self.store.read("get_history", |t| t.list_history()),
        }
    }

    pub fn get_match_result(&self, match_number: MatchNumber) -> LedgerResult<Option<MatchResult>> {
        self.store.read("get_match_result", |t| t.get_match_result(match_number))
    }

    /// Every decided match, in match-number order.
    pub fn get_match_results(&self) -> LedgerResult<Vec<MatchResult>> {
        self.store.read("get_match_results", |t| t.list_match_results())
    }

    pub fn get_actor_stats(&self, actor: &str) -> LedgerResult<ActorStats> {
        let actor = actor::canonical(actor);
        self.store.read("get_actor_stats", |t| {
            let matches_won = t
                .list_match_results()?
                .into_iter()
                .filter(|r| r.winner == actor)
                .map(|r| r.match_number)
                .collect();
            Ok(ActorStats {
                points: t.get_balance(&actor)?,
                entries: t.history_for_actor(&actor)?,
                matches_won,
                actor: actor.clone(),
            })
        })
    }

    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        self.store.read("snapshot", |t| {
            Ok(LedgerSnapshot {
                balances: t.standings()?,
                history: t.list_history()?,
                match_results: t.list_match_results()?,
            })
        })
    }

    /// Recompute balances and match results from the history log and
    /// report every divergence. Empty means the ledger is consistent.
    pub fn verify_consistency(&self) -> LedgerResult<Vec<Inconsistency>> {
        self.store.read("verify_consistency", |t| {
            let balances = t.get_all_balances()?;
            let totals = t.history_totals()?;
            let actors: BTreeSet<&Actor> = balances.keys().chain(totals.keys()).collect();

            let mut found = Vec::new();
            for actor in actors {
                let balance = balances.get(actor).copied().unwrap_or(0);
                let history_total = totals.get(actor).copied().unwrap_or(0);
                if balance != history_total {
                    found.push(Inconsistency::BalanceMismatch {
                        actor: actor.clone(),
                        balance,
                        history_total,
                    });
                }
            }

            let mut matches: BTreeSet<MatchNumber> = t
                .list_history()?
                .into_iter()
                .filter_map(|e| e.match_number)
                .collect();
            matches.extend(t.list_match_results()?.into_iter().map(|r| r.match_number));
            for m in matches {
                let indexed = t.get_match_result(m)?;
                let newest = t.latest_entry_for_match(m)?;
                let agrees = match (&indexed, &newest) {
                    (Some(r), Some(e)) => r.entry_id == e.id && r.winner == e.actor,
                    (None, None) => true,
                    _ => false,
                };
                if !agrees {
                    found.push(Inconsistency::StaleMatchResult { match_number: m });
                }
            }
            Ok(found)
        })
    }

    // ── Validation ───────────────────────────────────────────────

    fn validate(&self, award: &Award) -> LedgerResult<Actor> {
        let actor = actor::normalize(&award.actor)?;
        if award.recorded_by.trim().is_empty() {
            return Err(LedgerError::Validation("recorded_by must not be empty".into()));
        }
        if award.delta == 0 {
            return Err(LedgerError::Validation("A point change must not be zero.".into()));
        }
        let max = self.limits.max_points_per_update;
        if award.delta.unsigned_abs() > max.unsigned_abs() {
            return Err(LedgerError::Validation(format!(
                "Cannot change more than {max} point(s) in one update."
            )));
        }
        if let Some(m) = award.match_number {
            self.limits.check_match_number(m)?;
        }
        Ok(actor)
    }
}

fn log_failure(op: &str, e: &LedgerError) {
    match e {
        LedgerError::Store { .. } | LedgerError::Serialization(_) | LedgerError::Config(_) => {
            log::error!("{op} failed: {e}")
        }
        _ => log::debug!("{op} refused: {e}"),
    }
}
