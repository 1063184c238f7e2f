//! Session and daily-aggregate data model.
//!
//! A [`Session`] is one user-initiated interval of activity tracking, from
//! start to stop/reset. A [`DailyAggregate`] carries per-calendar-day totals
//! across the sessions of that day. The aggregate's *completed* portion
//! excludes the live session; read the combined totals through the
//! controller, which rides the live counters on top.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The in-progress or most-recently-stopped tracking interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// When the current run of active tracking began (epoch ms), if running.
    pub started_at_wall_clock: Option<i64>,
    /// Seconds of active tracking accrued before the current run.
    pub accumulated_seconds: u64,
    /// Sensor cumulative baseline captured when the session began; 0 on
    /// reset-per-subscription platforms.
    pub steps_at_session_start: u64,
    /// Steps attributed to this session. Always session-relative,
    /// always non-negative.
    pub current_steps: u64,
    /// True only while tracking is user-enabled and the sensor subscription
    /// is live.
    pub is_active: bool,
}

impl Session {
    /// Elapsed active seconds at `now_ms`:
    /// `accumulated + (running ? now - started_at : 0)`.
    ///
    /// Well-defined even when `started_at_wall_clock` was recovered from a
    /// different process run; a backwards clock step clamps the run to zero.
    pub fn elapsed_secs(&self, now_ms: i64) -> u64 {
        match self.started_at_wall_clock {
            Some(started) => {
                let run_ms = (now_ms - started).max(0);
                self.accumulated_seconds + (run_ms / 1000) as u64
            }
            None => self.accumulated_seconds,
        }
    }
}

/// Per-calendar-day totals of completed activity.
///
/// Created lazily on the first session of a day and reset at rollover. The
/// live session's counters are not folded in until the session ends (stop
/// contributes nothing extra: totals including the live session are computed
/// by the controller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Calendar day identifier, device-local.
    pub date: NaiveDate,
    /// Completed steps attributed to this day.
    pub total_steps: u64,
    /// Completed active seconds attributed to this day.
    pub total_seconds: u64,
}

impl DailyAggregate {
    pub fn new(date: NaiveDate) -> Self {
        DailyAggregate {
            date,
            total_steps: 0,
            total_seconds: 0,
        }
    }

    /// Folds a finished slice of session activity into the day.
    pub fn absorb(&mut self, steps: u64, seconds: u64) {
        self.total_steps += steps;
        self.total_seconds += seconds;
    }
}

/// The plain hand-off pair a stopped session yields to the (external)
/// activity-submission flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub steps: u64,
    pub duration_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_inactive() {
        let session = Session {
            accumulated_seconds: 120,
            ..Default::default()
        };
        assert_eq!(session.elapsed_secs(9_999_999), 120);
    }

    #[test]
    fn test_elapsed_running_across_process_runs() {
        // started_at captured by a previous process; now is 10 minutes later
        let session = Session {
            started_at_wall_clock: Some(1_000_000),
            accumulated_seconds: 60,
            is_active: true,
            ..Default::default()
        };
        assert_eq!(session.elapsed_secs(1_000_000 + 600_000), 60 + 600);
    }

    #[test]
    fn test_elapsed_clamps_backwards_clock() {
        let session = Session {
            started_at_wall_clock: Some(2_000_000),
            accumulated_seconds: 30,
            ..Default::default()
        };
        assert_eq!(session.elapsed_secs(1_000_000), 30);
    }

    #[test]
    fn test_daily_absorb() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let mut daily = DailyAggregate::new(date);
        daily.absorb(500, 300);
        daily.absorb(250, 120);
        assert_eq!(daily.total_steps, 750);
        assert_eq!(daily.total_seconds, 420);
        assert_eq!(daily.date, date);
    }
}
