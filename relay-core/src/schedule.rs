//! Check scheduling
//!
//! A [`Schedule`] decides when an in-progress run is checked again.
//! A [`Clock`] supplies "now" so callers and tests agree on the time.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Policy producing the next check deadline for an in-progress run
pub trait Schedule: Send + Sync {
    /// Returns the deadline by which the run should be checked again
    ///
    /// Implementations must return a time strictly after `now`.
    fn next_update_before(&self, now: DateTime<Utc>) -> DateTime<Utc>;
}

/// Checks again after a fixed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Intervals shorter than one second are raised to one second
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Self::MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Schedule for FixedInterval {
    fn next_update_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let step = chrono::Duration::from_std(self.interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(1));
        now.checked_add_signed(step).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_interval_adds_interval() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let schedule = FixedInterval::new(Duration::from_secs(30));

        assert_eq!(
            schedule.next_update_before(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 30).unwrap()
        );
    }

    #[test]
    fn test_zero_interval_is_still_in_the_future() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let schedule = FixedInterval::new(Duration::ZERO);

        assert_eq!(schedule.interval(), Duration::from_secs(1));
        assert!(schedule.next_update_before(now) > now);
    }

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(FixedClock(instant).now(), instant);
    }
}
