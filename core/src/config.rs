//! Process configuration.
//!
//! Read once from the environment at start-up and validated before the
//! store is opened. Every problem is collected so a misconfigured
//! deployment reports all of them at once.

use crate::{
    error::{LedgerError, LedgerResult},
    retry::RetryPolicy,
    types::{MatchNumber, Points},
};
use std::str::FromStr;
use std::time::Duration;

/// Bounds every award is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLimits {
    pub max_points_per_update: Points,
    pub max_match_number: MatchNumber,
}

impl LedgerLimits {
    /// Match numbers run `1..=max_match_number`.
    pub fn check_match_number(&self, match_number: MatchNumber) -> LedgerResult<()> {
        if match_number == 0 || match_number > self.max_match_number {
            return Err(LedgerError::Validation(format!(
                "Invalid match number. Must be between 1 and {}.",
                self.max_match_number
            )));
        }
        Ok(())
    }
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_points_per_update: 100,
            max_match_number: 74,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite file, or `:memory:`.
    pub db_path: String,
    /// How long a write waits on a locked database before failing.
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub command_cooldown: Duration,
    pub max_commands_per_minute: u32,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub admin_ids: Vec<String>,
    pub limits: LedgerLimits,
    pub store: StoreConfig,
    pub throttle: ThrottleConfig,
    pub retry: RetryPolicy,
    pub schedule_path: String,
    /// Offset of the league's reference timezone; IST is +330.
    pub league_utc_offset_minutes: i32,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut problems = Vec::new();
        let mut num = |key: &str, default: i64| -> i64 {
            match lookup(key) {
                None => default,
                Some(raw) => parse_or_note(key, &raw, &mut problems).unwrap_or(default),
            }
        };

        let max_points_per_update = num("MAX_POINTS_PER_UPDATE", 100);
        let max_match_number = num("MAX_MATCH_NUMBER", 74);
        let timeout_ms = num("DB_TIMEOUT_MS", 5_000);
        let cooldown_secs = num("COMMAND_COOLDOWN_SECS", 3);
        let per_minute = num("MAX_COMMANDS_PER_MINUTE", 10);
        let retry_attempts = num("RETRY_MAX_ATTEMPTS", 3);
        let retry_base_ms = num("RETRY_BASE_DELAY_MS", 50);
        let offset_minutes = num("LEAGUE_UTC_OFFSET_MINUTES", 330);

        let admin_ids = lookup("ADMIN_USER_IDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        let config = Self {
            admin_ids,
            limits: LedgerLimits {
                max_points_per_update,
                max_match_number: clamp_u32(max_match_number),
            },
            store: StoreConfig {
                db_path: lookup("DB_PATH").unwrap_or_else(|| "winledger.db".to_string()),
                timeout: Duration::from_millis(timeout_ms.max(0) as u64),
            },
            throttle: ThrottleConfig {
                command_cooldown: Duration::from_secs(cooldown_secs.max(0) as u64),
                max_commands_per_minute: clamp_u32(per_minute),
            },
            retry: RetryPolicy::new(
                clamp_u32(retry_attempts),
                Duration::from_millis(retry_base_ms.max(0) as u64),
            ),
            schedule_path: lookup("SCHEDULE_PATH")
                .unwrap_or_else(|| "data/schedule/ipl_2025.json".to_string()),
            league_utc_offset_minutes: offset_minutes.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        };

        if let Err(e) = config.validate() {
            problems.push(e.to_string());
        }
        if !problems.is_empty() {
            anyhow::bail!("invalid configuration: {}", problems.join("; "));
        }
        Ok(config)
    }

    /// Check the ranges the ledger relies on.
    pub fn validate(&self) -> LedgerResult<()> {
        let mut problems = Vec::new();
        if self.admin_ids.is_empty() {
            problems.push("At least one admin user ID is required (ADMIN_USER_IDS)".to_string());
        }
        if self.limits.max_points_per_update <= 0 {
            problems.push("MAX_POINTS_PER_UPDATE must be a positive integer".to_string());
        }
        if self.limits.max_match_number == 0 {
            problems.push("MAX_MATCH_NUMBER must be a positive integer".to_string());
        }
        if self.store.db_path.trim().is_empty() {
            problems.push("DB_PATH must not be empty".to_string());
        }
        if self.store.timeout.is_zero() {
            problems.push("DB_TIMEOUT_MS must be positive".to_string());
        }
        if self.throttle.max_commands_per_minute == 0 {
            problems.push("MAX_COMMANDS_PER_MINUTE must be positive".to_string());
        }
        if !(1..=RetryPolicy::MAX_ATTEMPTS).contains(&self.retry.max_attempts) {
            problems.push(format!(
                "RETRY_MAX_ATTEMPTS must be between 1 and {}",
                RetryPolicy::MAX_ATTEMPTS
            ));
        }
        if self.league_utc_offset_minutes.abs() >= 24 * 60 {
            problems.push("LEAGUE_UTC_OFFSET_MINUTES must be within a day".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Config(problems.join("; ")))
        }
    }

    /// A valid configuration with an in-memory store. Used by tests.
    pub fn default_test() -> Self {
        Self {
            admin_ids: vec!["1001".into()],
            limits: LedgerLimits::default(),
            store: StoreConfig {
                db_path: ":memory:".into(),
                timeout: Duration::from_millis(500),
            },
            throttle: ThrottleConfig {
                command_cooldown: Duration::from_secs(3),
                max_commands_per_minute: 10,
            },
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
            schedule_path: "data/schedule/ipl_2025.json".into(),
            league_utc_offset_minutes: 330,
        }
    }
}

fn parse_or_note<T: FromStr>(key: &str, raw: &str, problems: &mut Vec<String>) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            problems.push(format!("{key} is not a valid integer: {raw:?}"));
            None
        }
    }
}

fn clamp_u32(v: i64) -> u32 {
    v.clamp(0, u32::MAX as i64) as u32
}
