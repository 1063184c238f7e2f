//! Calendar-day rollover detection.
//!
//! The scheduler polls the current device-local day at a coarse cadence
//! instead of arming a precise midnight timer: a bounded rollover latency is
//! a fair trade for immunity to timers missed during suspension. Detecting
//! the change is separated from acting on it - the controller owns what a
//! rollover does to the session and the aggregate.

use chrono::NaiveDate;
use log::info;

/// Default poll cadence for day-change detection.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// A detected calendar-day transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayChange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Watches for the device-local calendar day to change.
#[derive(Debug, Clone)]
pub struct RolloverScheduler {
    current: NaiveDate,
}

impl RolloverScheduler {
    pub fn new(today: NaiveDate) -> Self {
        RolloverScheduler { current: today }
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current
    }

    /// Compares `today` against the tracked day, adopting it on change.
    ///
    /// A backwards jump (device clock edited across midnight) is reported as
    /// a change too; the caller resets the aggregate the same way.
    pub fn check(&mut self, today: NaiveDate) -> Option<DayChange> {
        if today == self.current {
            return None;
        }
        let change = DayChange {
            from: self.current,
            to: today,
        };
        info!("calendar day changed: {} -> {}", change.from, change.to);
        self.current = today;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_no_change() {
        let mut scheduler = RolloverScheduler::new(date(2026, 8, 6));
        assert_eq!(scheduler.check(date(2026, 8, 6)), None);
        assert_eq!(scheduler.current_date(), date(2026, 8, 6));
    }

    #[test]
    fn test_day_change_detected_once() {
        let mut scheduler = RolloverScheduler::new(date(2026, 8, 6));
        let change = scheduler.check(date(2026, 8, 7)).unwrap();
        assert_eq!(change.from, date(2026, 8, 6));
        assert_eq!(change.to, date(2026, 8, 7));
        assert_eq!(scheduler.check(date(2026, 8, 7)), None);
    }

    #[test]
    fn test_multi_day_gap_is_single_change() {
        let mut scheduler = RolloverScheduler::new(date(2026, 8, 6));
        let change = scheduler.check(date(2026, 8, 10)).unwrap();
        assert_eq!(change.to, date(2026, 8, 10));
    }

    #[test]
    fn test_backwards_date_reported() {
        let mut scheduler = RolloverScheduler::new(date(2026, 8, 6));
        let change = scheduler.check(date(2026, 8, 5)).unwrap();
        assert_eq!(change.to, date(2026, 8, 5));
    }
}
