//! Per-user command throttling.
//!
//! Two independent limits, checked in this order:
//!   - rate:     at most N commands per user in any rolling minute
//!   - cooldown: the same command from the same user at most once per window
//!
//! A refused command is not counted against the user.

use crate::config::ThrottleConfig;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Throttled {
    RateLimited { retry_after: Duration },
    CoolingDown { command: &'static str, retry_after: Duration },
}

impl fmt::Display for Throttled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { retry_after } => write!(
                f,
                "You're sending commands too quickly. Try again in {}s.",
                ceil_secs(*retry_after)
            ),
            Self::CoolingDown { command, retry_after } => write!(
                f,
                "Please wait {}s before using !{command} again.",
                ceil_secs(*retry_after)
            ),
        }
    }
}

fn ceil_secs(d: Duration) -> i64 {
    (d.num_milliseconds() + 999) / 1000
}

#[derive(Default)]
struct State {
    recent: HashMap<String, VecDeque<DateTime<Utc>>>,
    last_used: HashMap<(String, &'static str), DateTime<Utc>>,
}

pub struct Throttle {
    cooldown: Duration,
    per_minute: usize,
    state: Mutex<State>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            cooldown: Duration::from_std(config.command_cooldown).unwrap_or_else(|_| Duration::zero()),
            per_minute: config.max_commands_per_minute as usize,
            state: Mutex::new(State::default()),
        }
    }

    /// Record `command` from `user` at `now`, or say why it must wait.
    pub fn check(&self, user: &str, command: &'static str, now: DateTime<Utc>) -> Result<(), Throttled> {
        let window = Duration::minutes(1);
        let mut state = self.state.lock();

        let recent = state.recent.entry(user.to_string()).or_default();
        while recent.front().is_some_and(|t| now - *t >= window) {
            recent.pop_front();
        }
        if recent.len() >= self.per_minute {
            let oldest = recent.front().copied().unwrap_or(now);
            return Err(Throttled::RateLimited { retry_after: oldest + window - now });
        }

        let key = (user.to_string(), command);
        if let Some(last) = state.last_used.get(&key) {
            let ready_at = *last + self.cooldown;
            if now < ready_at {
                return Err(Throttled::CoolingDown { command, retry_after: ready_at - now });
            }
        }

        state.last_used.insert(key, now);
        state.recent.entry(user.to_string()).or_default().push_back(now);
        Ok(())
    }

    /// Forget entries older than the longest window. Called periodically.
    pub fn prune(&self, now: DateTime<Utc>) {
        let horizon = Duration::minutes(1).max(self.cooldown);
        let mut state = self.state.lock();
        state.recent.retain(|_, times| {
            times.retain(|t| now - *t < horizon);
            !times.is_empty()
        });
        state.last_used.retain(|_, t| now - *t < horizon);
    }
}
