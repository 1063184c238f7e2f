//! Elapsed-time accounting for a tracking session.
//!
//! A [`SessionClock`] accumulates active time as `accumulated_secs` plus a
//! wall-clock delta from the start of the current run. The UI's periodic tick
//! only re-renders a duration string; killing and reviving the ticker never
//! changes `elapsed_secs`, and neither does the app being suspended or the
//! process dying, as long as the two fields are restored.

use crate::clock::Clock;
use std::sync::Arc;

/// Computes elapsed active time from accumulated duration plus wall-clock
/// deltas.
///
/// Invariant: `elapsed_secs() == accumulated_secs + (running ? now -
/// started_at : 0)`, well-defined even when `started_at` was captured by a
/// previous process run. A wall clock stepping backwards can pull the run
/// delta negative; it clamps to zero rather than being corrected.
pub struct SessionClock {
    clock: Arc<dyn Clock>,
    accumulated_secs: u64,
    started_at_ms: Option<i64>,
}

impl SessionClock {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        SessionClock {
            clock,
            accumulated_secs: 0,
            started_at_ms: None,
        }
    }

    /// Begins (or resumes) a run by capturing the current wall-clock time.
    ///
    /// Calling `start` while already running keeps the original run start so
    /// in-progress time is not dropped.
    pub fn start(&mut self) {
        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(self.clock.now_ms());
        }
    }

    /// Folds the current run into `accumulated_secs` and stops running.
    /// Idempotent.
    pub fn pause(&mut self) {
        self.accumulated_secs = self.elapsed_secs();
        self.started_at_ms = None;
    }

    /// Zeroes both fields. The clock ends up stopped.
    pub fn reset(&mut self) {
        self.accumulated_secs = 0;
        self.started_at_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Elapsed active seconds, derived from the wall clock on every call.
    pub fn elapsed_secs(&self) -> u64 {
        match self.started_at_ms {
            Some(started) => {
                let run_ms = (self.clock.now_ms() - started).max(0);
                self.accumulated_secs + (run_ms / 1000) as u64
            }
            None => self.accumulated_secs,
        }
    }

    pub fn accumulated_secs(&self) -> u64 {
        self.accumulated_secs
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    /// Reinstates persisted fields, typically from a snapshot written by an
    /// earlier process run. A `started_at_ms` in the past immediately yields
    /// the full elapsed interval without waiting for any tick.
    pub fn restore(&mut self, accumulated_secs: u64, started_at_ms: Option<i64>) {
        self.accumulated_secs = accumulated_secs;
        self.started_at_ms = started_at_ms;
    }
}
