//! winledger-core: a transactional points ledger for match-winner contests.
//!
//!   ledger   balances, history, match results; the only writer
//!   policy   who may record which win, and when
//!   bot      chat commands routed onto the two above

pub mod actor;
pub mod bot;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod ledger;
pub mod outcome;
pub mod policy;
pub mod retry;
pub mod schedule;
pub mod snapshot;
pub mod store;
pub mod throttle;
pub mod types;

pub use error::{ConstraintViolation, LedgerError, LedgerResult};
pub use ledger::{Award, LedgerService};
pub use outcome::{Outcome, Rejection};
