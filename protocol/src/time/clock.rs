//! Wall-clock abstraction.
//!
//! The engine and the devnet ledger both read "now" through a [`Clock`].
//! Production uses [`SystemClock`]; tests share one [`ManualClock`] between
//! the two so that advancing past a deadline is visible on both sides.

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// The real UTC wall clock, truncated to whole seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        Utc.timestamp_opt(now.timestamp(), 0)
            .single()
            .unwrap_or(now)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Starts at the given Unix timestamp (seconds).
    pub fn at_timestamp(secs: i64) -> Self {
        Self::new(
            Utc.timestamp_opt(secs, 0)
                .single()
                .unwrap_or_else(Utc::now),
        )
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at_timestamp(1_700_000_000);
        assert_eq!(clock.now().timestamp(), 1_700_000_000);
        clock.advance_secs(90);
        assert_eq!(clock.now().timestamp(), 1_700_000_090);
    }

    #[test]
    fn clones_share_state() {
        let a = ManualClock::at_timestamp(0);
        let b = a.clone();
        a.advance_secs(10);
        assert_eq!(b.now().timestamp(), 10);
    }

    #[test]
    fn system_clock_has_no_subsecond_component() {
        assert_eq!(SystemClock.now().timestamp_subsec_nanos(), 0);
    }
}
