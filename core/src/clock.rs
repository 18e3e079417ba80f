//! League clock. Owns "now" and "today" in the reference timezone.
//!
//! RULE: Only the clock converts between UTC and league-local time.
//! The ledger stores UTC; the policy gate compares plain dates.

use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use parking_lot::Mutex;

/// Source of the current instant.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct WallClock;

impl TimeSource for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A hand-driven time source for tests and replays.
pub struct ManualTime {
    now: Mutex<DateTime<Utc>>,
}

impl ManualTime {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

pub struct LeagueClock {
    offset: FixedOffset,
    source: Box<dyn TimeSource>,
}

impl LeagueClock {
    pub fn new(utc_offset_minutes: i32, source: Box<dyn TimeSource>) -> LedgerResult<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            LedgerError::Config(format!("UTC offset of {utc_offset_minutes} minutes is out of range"))
        })?;
        Ok(Self { offset, source })
    }

    pub fn system(utc_offset_minutes: i32) -> LedgerResult<Self> {
        Self::new(utc_offset_minutes, Box::new(WallClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.source.now()
    }

    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.now().with_timezone(&self.offset)
    }

    /// The calendar date in the league's timezone.
    pub fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn today_rolls_over_at_local_midnight() {
        // 18:29 UTC is 23:59 IST; one minute later it's the next day.
        let time = Arc::new(ManualTime::new(Utc.with_ymd_and_hms(2025, 3, 22, 18, 29, 0).unwrap()));
        let clock = LeagueClock::new(330, Box::new(time.clone())).unwrap();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 22).unwrap());

        time.advance(Duration::minutes(1));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 23).unwrap());
    }

    #[test]
    fn absurd_offsets_are_rejected() {
        assert!(LeagueClock::system(24 * 60).is_err());
    }
}
