//! Audit events. One per committed ledger mutation.
//!
//! RULE: An event is emitted only after its transaction commits.
//! A rolled-back operation leaves no audit line.

use crate::types::{Actor, EntryId, MatchNumber, Points};
use serde::{Deserialize, Serialize};

pub const AUDIT_TARGET: &str = "winledger::audit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    PointsAwarded {
        entry_id: EntryId,
        actor: Actor,
        delta: Points,
        match_number: Option<MatchNumber>,
        recorded_by: Actor,
        balance: Points,
        /// The winner this award displaced, when an admin overwrote a match.
        replaced_winner: Option<Actor>,
    },
    AwardUndone {
        entry_id: EntryId,
        actor: Actor,
        delta: Points,
        match_number: Option<MatchNumber>,
        balance: Points,
        /// Who the match falls back to once this entry is gone.
        restored_winner: Option<Actor>,
    },
    LedgerCleared {
        balances: usize,
        entries: usize,
        match_results: usize,
    },
}

impl LedgerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PointsAwarded { .. } => "points_awarded",
            Self::AwardUndone { .. }   => "award_undone",
            Self::LedgerCleared { .. } => "ledger_cleared",
        }
    }

    /// Write the event as one JSON line on the audit target.
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => log::info!(target: AUDIT_TARGET, "{json}"),
            Err(e) => log::error!(target: AUDIT_TARGET, "unserialisable {} event: {e}", self.event_type()),
        }
    }
}
