//! Expected negative results, kept apart from real failures.
//!
//! A ledger call yields one of three things:
//!   - `Ok(Outcome::Done(v))`     the operation happened
//!   - `Ok(Outcome::Rejected(r))` nothing to do, or the caller may not do it
//!   - `Err(LedgerError)`         something broke

use crate::types::{Actor, MatchNumber};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Done(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(v) => Some(v),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Done(_) => None,
            Self::Rejected(r) => Some(r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    NothingToUndo,
    UnknownMatch {
        match_number: MatchNumber,
    },
    NotToday {
        match_number: MatchNumber,
        scheduled: NaiveDate,
        today: NaiveDate,
    },
    AlreadyClaimed {
        match_number: MatchNumber,
        winner: Actor,
    },
    AdminOnly,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToUndo => write!(f, "No points to undo"),
            Self::UnknownMatch { match_number } => {
                write!(f, "Match {match_number} is not on the schedule")
            }
            Self::NotToday { match_number, scheduled, .. } => write!(
                f,
                "Match {match_number} is scheduled for {scheduled}. You can only record points \
                 for matches scheduled for today. Admins can record points for any match."
            ),
            Self::AlreadyClaimed { match_number, winner } => {
                write!(f, "Match {match_number} has already been claimed by {winner}")
            }
            Self::AdminOnly => write!(f, "This command is restricted to admin users only."),
        }
    }
}
