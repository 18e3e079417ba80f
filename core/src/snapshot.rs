//! Snapshot serialization. The full ledger to/from JSON.
//!
//! A snapshot captures all three tables read inside one transaction,
//! so it is always internally consistent. Two snapshots compare equal
//! exactly when the ledgers hold the same state.

use crate::store::{HistoryEntry, MatchResult, Standing};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub balances: Vec<Standing>,
    pub history: Vec<HistoryEntry>,
    pub match_results: Vec<MatchResult>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty() && self.history.is_empty() && self.match_results.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
