//! Wall-clock source and owned repeating timers.
//!
//! Everything in the crate that measures elapsed time does so through the
//! [`Clock`] trait, so session math can be exercised with a [`ManualClock`]
//! in tests and in the replay binary. [`Ticker`] is the owned repeating-timer
//! resource used for the UI refresh tick and the rollover poll cadence; it is
//! released on drop and is never a source of truth for elapsed time.

use chrono::{Local, LocalResult, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Provider of "now" as a wall-clock timestamp.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Current calendar day, device-local.
    fn local_date(&self) -> NaiveDate {
        local_date_of_ms(self.now_ms())
    }
}

/// Converts an epoch-millisecond timestamp to the device-local calendar day.
pub fn local_date_of_ms(ms: i64) -> NaiveDate {
    match Local.timestamp_millis_opt(ms) {
        LocalResult::Single(dt) => dt.date_naive(),
        LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        // Nonexistent local time (DST gap); fall back to UTC
        LocalResult::None => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
    }
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A settable clock for tests and deterministic replay.
///
/// Time only moves when told to, so scripted scenarios can fast-forward
/// through suspensions and day boundaries.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        ManualClock {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    /// A manual clock seeded from the real wall clock.
    pub fn from_system() -> Self {
        Self::new(SystemClock.now_ms())
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// An owned repeating timer with an explicit lifecycle.
///
/// The callback fires on a dedicated thread at the given interval until
/// [`Ticker::stop`] is called or the ticker is dropped. `stop` signals the
/// thread and detaches it instead of joining, so stopping a ticker from a
/// callsite that holds a lock the tick callback also wants cannot deadlock;
/// the thread exits at its next wakeup.
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    /// Spawns a ticker invoking `tick` every `interval`.
    pub fn spawn<F>(interval: Duration, tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("stridewell-ticker".to_string())
            .spawn(move || {
                loop {
                    thread::park_timeout(interval);
                    if thread_stop.load(Ordering::SeqCst) {
                        break;
                    }
                    tick();
                }
            })
            .expect("failed to spawn ticker thread");

        Ticker {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the ticker thread to exit. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000_000);
        assert_eq!(clock.now_ms(), 1_000_000);
        clock.advance_secs(90);
        assert_eq!(clock.now_ms(), 1_090_000);
        clock.set_ms(500);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_manual_clock_local_date_rolls_with_time() {
        let clock = ManualClock::from_system();
        let before = clock.local_date();
        // 48 hours forward always crosses at least one local midnight
        clock.advance_secs(48 * 3600);
        let after = clock.local_date();
        assert!(after > before);
    }

    #[test]
    fn test_ticker_fires_and_stops() {
        let count = Arc::new(AtomicU32::new(0));
        let tick_count = Arc::clone(&count);
        let mut ticker = Ticker::spawn(Duration::from_millis(10), move || {
            tick_count.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(100));
        ticker.stop();
        let fired = count.load(Ordering::SeqCst);
        assert!(fired > 0, "ticker should have fired at least once");

        // No more ticks after stop
        thread::sleep(Duration::from_millis(50));
        assert!(count.load(Ordering::SeqCst) <= fired + 1);
    }

    #[test]
    fn test_ticker_stop_idempotent() {
        let mut ticker = Ticker::spawn(Duration::from_millis(10), || {});
        ticker.stop();
        ticker.stop();
    }
}
