use crate::types::{Actor, MatchNumber, Points};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Constraint violated: {0}")]
    Constraint(#[from] ConstraintViolation),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error during {op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A write that would break a ledger rule. Nothing is committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    #[error("{actor} has {balance} point(s); applying {delta} would drop below zero")]
    NegativeBalance {
        actor: Actor,
        balance: Points,
        delta: Points,
    },

    #[error("match {match_number} already has a winner ({winner})")]
    MatchAlreadyDecided {
        match_number: MatchNumber,
        winner: Actor,
    },
}

impl From<rusqlite::Error> for LedgerError {
    fn from(source: rusqlite::Error) -> Self {
        Self::Store { op: "query", source }
    }
}

impl LedgerError {
    /// Tag a store failure with the ledger operation it happened in.
    pub(crate) fn during(self, op: &'static str) -> Self {
        match self {
            Self::Store { source, .. } => Self::Store { op, source },
            other => other,
        }
    }

    /// Busy/locked database. The only failures worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store {
                source: rusqlite::Error::SqliteFailure(e, _),
                ..
            } => matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked),
            _ => false,
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short text that is safe to show in chat. Store internals stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Constraint(c) => c.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Store { .. } | Self::Serialization(_) | Self::Config(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
