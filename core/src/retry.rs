//! Bounded retry with exponential backoff for transient store failures.
//!
//! Only errors where `LedgerError::is_transient()` holds are retried.
//! Ledger mutations are atomic per call, so a failed attempt left no
//! trace and running it again is safe.

use crate::error::LedgerResult;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// ±fraction of each delay, so concurrent callers don't retry in lockstep.
    pub jitter_factor: f64,
}

impl RetryPolicy {
    pub const MAX_ATTEMPTS: u32 = 3;

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier: 2.0,
            max_delay: Duration::from_secs(2),
            jitter_factor: 0.3,
        }
    }

    /// One attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);
        let jitter_ms = if self.jitter_factor > 0.0 && capped_ms > 0.0 {
            rand::thread_rng().gen_range(-self.jitter_factor..=self.jitter_factor) * capped_ms
        } else {
            0.0
        };
        Duration::from_millis((capped_ms + jitter_ms).max(0.0).round() as u64)
    }

    /// Run `f`, retrying transient failures. The last error is returned
    /// once attempts run out.
    pub fn run<T>(&self, op: &str, mut f: impl FnMut() -> LedgerResult<T>) -> LedgerResult<T> {
        let attempts = self.max_attempts.clamp(1, Self::MAX_ATTEMPTS);
        let mut attempt = 1;
        loop {
            match f() {
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.backoff(attempt);
                    log::warn!("{op} failed (attempt {attempt}/{attempts}), retrying in {delay:?}: {e}");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        log::error!("{op} failed after {attempt} attempt(s): {e}");
                    }
                    return Err(e);
                }
                ok => return ok,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::MAX_ATTEMPTS, Duration::from_millis(50))
    }
}
