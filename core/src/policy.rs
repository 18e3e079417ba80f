//! Command policy. Decides whether an untrusted caller may record a win.
//!
//!   admin      → straight to the ledger, any match, any day
//!   non-admin  → the match must be on the schedule, scheduled today
//!                (league timezone), and not yet decided by anyone
//!
//! The "already decided" gate is global per match: the first claim wins
//! and later claims from every ordinary caller are refused, whoever they
//! are. It is not a per-user daily quota.
//!
//! This layer never writes. Its only side effect is the delegated
//! `LedgerService::award` call.

use crate::{
    error::{ConstraintViolation, LedgerError, LedgerResult},
    ledger::{Award, AwardReceipt, LedgerService},
    outcome::{Outcome, Rejection},
    schedule::ScheduleLookup,
    types::{Authority, MatchNumber},
};
use chrono::NaiveDate;
use std::collections::HashSet;

/// The person issuing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Opaque platform id; admin rights are keyed on it.
    pub id: String,
    /// Recorded as `recorded_by` on history entries.
    pub name: String,
}

impl Caller {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// Configured admin allow-list.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    ids: HashSet<String>,
}

impl AdminList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { ids: ids.into_iter().map(Into::into).collect() }
    }

    pub fn is_admin(&self, caller_id: &str) -> bool {
        self.ids.contains(caller_id)
    }

    pub fn authority_of(&self, caller: &Caller) -> Authority {
        Authority::from_admin_flag(self.is_admin(&caller.id))
    }
}

pub struct CommandPolicy<'a, S: ScheduleLookup + ?Sized> {
    ledger: &'a LedgerService,
    schedule: &'a S,
    admins: &'a AdminList,
}

impl<'a, S: ScheduleLookup + ?Sized> CommandPolicy<'a, S> {
    pub fn new(ledger: &'a LedgerService, schedule: &'a S, admins: &'a AdminList) -> Self {
        Self { ledger, schedule, admins }
    }

    /// The gate on its own, with no write. `None` means the claim would
    /// be accepted right now. An out-of-range match number is a
    /// validation error for every caller.
    pub fn check(
        &self,
        caller: &Caller,
        match_number: MatchNumber,
        today: NaiveDate,
    ) -> LedgerResult<Option<Rejection>> {
        self.ledger.limits().check_match_number(match_number)?;
        if self.admins.is_admin(&caller.id) {
            return Ok(None);
        }
        let Some(info) = self.schedule.lookup(match_number) else {
            return Ok(Some(Rejection::UnknownMatch { match_number }));
        };
        if info.date != today {
            return Ok(Some(Rejection::NotToday {
                match_number,
                scheduled: info.date,
                today,
            }));
        }
        if let Some(result) = self.ledger.get_match_result(match_number)? {
            return Ok(Some(Rejection::AlreadyClaimed {
                match_number,
                winner: result.winner,
            }));
        }
        Ok(None)
    }

    /// Record one point for `actor` winning `match_number`, if `caller`
    /// is allowed to. `today` is the league-local date.
    pub fn request_award(
        &self,
        caller: &Caller,
        actor: &str,
        match_number: MatchNumber,
        today: NaiveDate,
    ) -> LedgerResult<Outcome<AwardReceipt>> {
        let authority = self.admins.authority_of(caller);
        if let Some(rejection) = self.check(caller, match_number, today)? {
            log::debug!("win claim by {} for match {match_number} refused: {rejection}", caller.id);
            return Ok(Outcome::Rejected(rejection));
        }

        let award = Award::win(actor, match_number, caller.name.clone()).by(authority);
        match self.ledger.award(&award) {
            Ok(receipt) => Ok(Outcome::Done(receipt)),
            // Lost a race with another claim between check and write.
            Err(LedgerError::Constraint(ConstraintViolation::MatchAlreadyDecided {
                match_number,
                winner,
            })) => Ok(Outcome::Rejected(Rejection::AlreadyClaimed { match_number, winner })),
            Err(e) => Err(e),
        }
    }
}
