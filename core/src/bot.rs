//! Message router: chat text in, reply text out.
//!
//! Order of checks for every message:
//!   1. not a command          → ignored, no reply
//!   2. throttle               → wait message
//!   3. admin-only command     → refused for non-admins
//!   4. dispatch               → ledger / schedule / formatting
//!
//! Store failures are retried per `RetryPolicy`, logged in full, and
//! reported to chat as a generic message.

use crate::{
    actor,
    clock::LeagueClock,
    command::{self, BotCommand},
    config::BotConfig,
    error::{LedgerError, LedgerResult},
    format,
    ledger::LedgerService,
    outcome::{Outcome, Rejection},
    policy::{AdminList, Caller, CommandPolicy},
    retry::RetryPolicy,
    schedule::{Schedule, ScheduleLookup},
    throttle::{Throttle, Throttled},
};
use std::sync::atomic::{AtomicU64, Ordering};

const PRUNE_EVERY: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub caller: Caller,
    pub text: String,
}

impl InboundMessage {
    pub fn new(caller: Caller, text: impl Into<String>) -> Self {
        Self { caller, text: text.into() }
    }
}

pub struct Bot {
    ledger: LedgerService,
    schedule: Schedule,
    admins: AdminList,
    clock: LeagueClock,
    throttle: Throttle,
    retry: RetryPolicy,
    handled: AtomicU64,
}

impl Bot {
    pub fn new(ledger: LedgerService, schedule: Schedule, clock: LeagueClock, config: &BotConfig) -> Self {
        Self {
            ledger,
            schedule,
            admins: AdminList::new(config.admin_ids.iter().cloned()),
            clock,
            throttle: Throttle::new(config.throttle),
            retry: config.retry,
            handled: AtomicU64::new(0),
        }
    }

    /// Open the store, load the schedule, and start the wall clock.
    pub fn from_config(config: &BotConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let ledger = LedgerService::open(&config.store, config.limits)?;
        let schedule = Schedule::load(&config.schedule_path)?;
        let missing = schedule.missing_matches(config.limits.max_match_number);
        if let Some(first) = missing.first() {
            anyhow::bail!(
                "{} has no fixture for {} match number(s) up to MAX_MATCH_NUMBER={} (first: {first})",
                config.schedule_path,
                missing.len(),
                config.limits.max_match_number
            );
        }
        let clock = LeagueClock::system(config.league_utc_offset_minutes)?;
        Ok(Self::new(ledger, schedule, clock, config))
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn clock(&self) -> &LeagueClock {
        &self.clock
    }

    /// Handle one chat message. `None` means stay silent.
    pub fn handle(&self, msg: &InboundMessage) -> Option<String> {
        let parsed = command::parse(&msg.text)?;
        let now = self.clock.now();
        if self.handled.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.throttle.prune(now);
        }

        let name = match &parsed {
            Ok(cmd) => cmd.name(),
            Err(e) => e.command(),
        };
        if let Err(wait) = self.throttle.check(&msg.caller.id, name, now) {
            log::debug!("throttled {} on !{name}: {wait}", msg.caller.id);
            return Some(match wait {
                Throttled::RateLimited { .. } => format!("⚠️ {wait}"),
                Throttled::CoolingDown { .. } => format!("⏳ {wait}"),
            });
        }

        let cmd = match parsed {
            Ok(cmd) => cmd,
            Err(e) => return Some(format!("{} {e}", format::FAIL)),
        };
        if cmd.requires_admin() && !self.admins.is_admin(&msg.caller.id) {
            log::info!("{} ({}) tried admin command !{name}", msg.caller.name, msg.caller.id);
            return Some(format!("{} {}", format::FAIL, Rejection::AdminOnly));
        }

        log::debug!("{} ({}) → !{name}", msg.caller.name, msg.caller.id);
        let reply = self.dispatch(&msg.caller, cmd).unwrap_or_else(|e| {
            if e.is_validation() || e.is_constraint() {
                log::debug!("!{name} from {} refused: {e}", msg.caller.id);
            } else {
                log::error!("!{name} from {} failed: {e}", msg.caller.id);
            }
            format!("{} {}", format::FAIL, e.user_message())
        });
        Some(reply)
    }

    fn dispatch(&self, caller: &Caller, cmd: BotCommand) -> LedgerResult<String> {
        match cmd {
            BotCommand::Win { actor, match_number } => {
                let today = self.clock.today();
                let policy = CommandPolicy::new(&self.ledger, &self.schedule, &self.admins);
                let outcome = self
                    .retry
                    .run("win", || policy.request_award(caller, &actor, match_number, today))?;
                Ok(match outcome {
                    Outcome::Done(receipt) => format::award(&receipt),
                    Outcome::Rejected(r) => format!("{} {r}", format::FAIL),
                })
            }
            BotCommand::Leaderboard => {
                let standings = self.retry.run("d11", || self.ledger.get_leaderboard())?;
                let results = self.retry.run("d11", || self.ledger.get_match_results())?;
                Ok(format::leaderboard_with_winners(&standings, &results, &self.schedule))
            }
            BotCommand::Today => Ok(format::todays_matches(&self.schedule.matches_on(self.clock.today()))),
            BotCommand::Stats { actor } => {
                let actor = actor::normalize(&actor)?;
                let stats = self.retry.run("stats", || self.ledger.get_actor_stats(&actor))?;
                Ok(format::stats(&stats))
            }
            BotCommand::About => Ok(format::about()),
            BotCommand::Undo => {
                let outcome = self.retry.run("undo", || self.ledger.undo_last())?;
                Ok(match outcome {
                    Outcome::Done(receipt) => format!("{} {}", format::OK, receipt.description()),
                    Outcome::Rejected(r) => format!("{} {r}", format::FAIL),
                })
            }
            BotCommand::ClearPoints => {
                log::warn!("{} ({}) is clearing the ledger", caller.name, caller.id);
                let receipt = self.retry.run("clearpoints", || self.ledger.clear_all())?;
                Ok(format::cleared(&receipt))
            }
            BotCommand::AdminLog => {
                let results = self.retry.run("adminlog", || self.ledger.get_match_results())?;
                Ok(format::admin_log(&results))
            }
            BotCommand::Export => {
                let snapshot = self.retry.run("export", || self.ledger.snapshot())?;
                let json = snapshot.to_json().map_err(LedgerError::from)?;
                Ok(format!("```json\n{json}\n```"))
            }
        }
    }
}
