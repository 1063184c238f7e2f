//! Step-sensor normalization.
//!
//! Platforms disagree about what a step reading means: some deliver a
//! cumulative count since an arbitrary historical reference, others a count
//! accrued only since the current subscription began. [`StepSensorAdapter`]
//! hides that split behind one semantic - "steps since session start" - with
//! the strategy picked once at construction rather than re-checked per
//! callback.
//!
//! Subscriptions are generational: a new subscribe or an unsubscribe
//! invalidates any in-flight callback from a prior generation before it can
//! apply itself, so stopping tracking is a synchronous cut-off.

use crate::error::{Result, TrackerError};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Raw reading callback handed to the platform.
pub type RawReadingFn = Box<dyn Fn(u64) + Send + Sync>;

/// Session-relative update callback handed to the adapter's caller.
pub type StepUpdateFn = Box<dyn Fn(u64) + Send + Sync>;

/// Result of a historical step query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoricalSteps {
    Steps(u64),
    /// The platform cannot answer historical queries. Not an error.
    Unsupported,
}

/// Which counting contract the platform sensor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorMode {
    /// Readings are cumulative since an arbitrary reference point.
    Cumulative,
    /// Readings count from zero at each subscription.
    ResetPerSubscription,
}

/// The platform step-sensor contract.
pub trait StepSource: Send + Sync {
    fn is_available(&self) -> bool;

    /// Installs a reading callback. May deliver an initial reading
    /// synchronously before returning.
    fn subscribe(&self, on_reading: RawReadingFn) -> Result<SourceHandle>;

    /// Steps recorded in `[since_ms, until_ms]`, where the platform keeps
    /// history; `Unsupported` otherwise.
    fn query_historical_steps(&self, since_ms: i64, until_ms: i64) -> HistoricalSteps;
}

/// Platform-provided unsubscribe capability. Cancels on drop; cancelling an
/// already-cancelled handle is a no-op.
pub struct SourceHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SourceHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        SourceHandle {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn noop() -> Self {
        SourceHandle { cancel: None }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Normalizes a [`StepSource`] to session-relative step counts.
pub struct StepSensorAdapter {
    source: Arc<dyn StepSource>,
    mode: SensorMode,
    next_generation: AtomicU64,
    active_generation: Arc<AtomicU64>,
}

impl StepSensorAdapter {
    pub fn new(source: Arc<dyn StepSource>, mode: SensorMode) -> Self {
        StepSensorAdapter {
            source,
            mode,
            next_generation: AtomicU64::new(0),
            active_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    pub fn is_available(&self) -> bool {
        self.source.is_available()
    }

    /// Subscribes for session-relative step updates.
    ///
    /// `base_steps` is the count already attributed to the session before
    /// this subscription (non-zero when resuming after a background pause).
    /// On cumulative platforms the fresh baseline is queried *before* the
    /// platform subscription is installed, so a reading can never be compared
    /// against a stale baseline. Each call starts a new generation and
    /// invalidates callbacks from any prior one.
    ///
    /// Fails with [`TrackerError::SensorUnavailable`] when the device has no
    /// sensor, or [`TrackerError::PermissionDenied`] when the platform
    /// refuses the subscription; callers treat the two differently.
    pub fn subscribe(
        &self,
        base_steps: u64,
        now_ms: i64,
        on_update: Option<StepUpdateFn>,
    ) -> Result<StepSubscription> {
        if !self.source.is_available() {
            return Err(TrackerError::SensorUnavailable);
        }

        let baseline = match self.mode {
            SensorMode::Cumulative => match self.source.query_historical_steps(0, now_ms) {
                HistoricalSteps::Steps(count) => count,
                HistoricalSteps::Unsupported => 0,
            },
            SensorMode::ResetPerSubscription => 0,
        };

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.active_generation.store(generation, Ordering::SeqCst);

        let steps = Arc::new(AtomicU64::new(base_steps));
        let cell = Arc::clone(&steps);
        let live = Arc::clone(&self.active_generation);
        let mode = self.mode;

        let handle = self.source.subscribe(Box::new(move |raw| {
            if live.load(Ordering::SeqCst) != generation {
                debug!("dropping step reading from stale subscription generation {}", generation);
                return;
            }
            let session_steps = match mode {
                // An OS-side counter reset makes raw < baseline; the delta
                // clamps to zero until a resume refreshes the baseline.
                SensorMode::Cumulative => base_steps + raw.saturating_sub(baseline),
                SensorMode::ResetPerSubscription => base_steps + raw,
            };
            cell.store(session_steps, Ordering::SeqCst);
            if let Some(callback) = &on_update {
                callback(session_steps);
            }
        }))?;

        Ok(StepSubscription {
            generation,
            active: Arc::clone(&self.active_generation),
            steps,
            baseline,
            handle: Some(handle),
        })
    }
}

/// A live subscription yielding session-relative steps.
///
/// The latest count is readable at any time via [`current_steps`]; the
/// optional update callback only exists to refresh a display.
///
/// [`current_steps`]: StepSubscription::current_steps
pub struct StepSubscription {
    generation: u64,
    active: Arc<AtomicU64>,
    steps: Arc<AtomicU64>,
    baseline: u64,
    handle: Option<SourceHandle>,
}

impl StepSubscription {
    /// Latest session-relative step count.
    pub fn current_steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    /// The cumulative baseline captured when this subscription was created
    /// (0 on reset-per-subscription platforms).
    pub fn baseline(&self) -> u64 {
        self.baseline
    }

    /// Tears the subscription down. Any in-flight callback of this
    /// generation is invalidated before this returns. Idempotent; a newer
    /// subscription is left untouched.
    pub fn unsubscribe(&mut self) {
        let _ = self.active.compare_exchange(
            self.generation,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl Drop for StepSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedStepSource;

    fn cumulative_adapter(source: &Arc<SimulatedStepSource>) -> StepSensorAdapter {
        StepSensorAdapter::new(
            Arc::clone(source) as Arc<dyn StepSource>,
            SensorMode::Cumulative,
        )
    }

    #[test]
    fn test_cumulative_mode_subtracts_baseline() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        source.walk(1000); // pre-session history
        let adapter = cumulative_adapter(&source);

        let sub = adapter.subscribe(0, 0, None).unwrap();
        assert_eq!(sub.baseline(), 1000);
        assert_eq!(sub.current_steps(), 0);

        source.walk(250);
        assert_eq!(sub.current_steps(), 250);
    }

    #[test]
    fn test_cumulative_mode_without_history_uses_zero_baseline() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        source.set_history_supported(false);
        source.walk(1000);
        let adapter = cumulative_adapter(&source);

        let sub = adapter.subscribe(0, 0, None).unwrap();
        assert_eq!(sub.baseline(), 0);

        source.walk(10);
        // Without history the pre-session count leaks into the session;
        // accepted platform degradation.
        assert_eq!(sub.current_steps(), 1010);
    }

    #[test]
    fn test_reset_mode_passes_through() {
        let source = Arc::new(SimulatedStepSource::reset_per_subscription());
        source.walk(5000); // pre-subscription movement is invisible
        let adapter = StepSensorAdapter::new(
            Arc::clone(&source) as Arc<dyn StepSource>,
            SensorMode::ResetPerSubscription,
        );

        let sub = adapter.subscribe(0, 0, None).unwrap();
        source.walk(120);
        assert_eq!(sub.baseline(), 0);
        assert_eq!(sub.current_steps(), 120);
    }

    #[test]
    fn test_base_steps_carry_across_resubscribe() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        let adapter = cumulative_adapter(&source);

        let mut sub = adapter.subscribe(0, 0, None).unwrap();
        source.walk(100);
        assert_eq!(sub.current_steps(), 100);
        sub.unsubscribe();

        // Steps taken while unsubscribed are not attributed
        source.walk(400);

        let sub2 = adapter.subscribe(100, 0, None).unwrap();
        assert_eq!(sub2.baseline(), 500);
        source.walk(100);
        assert_eq!(sub2.current_steps(), 200);
    }

    #[test]
    fn test_os_counter_reset_clamps_until_fresh_baseline() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        source.walk(1000);
        let adapter = cumulative_adapter(&source);

        let sub = adapter.subscribe(0, 0, None).unwrap();
        source.reset_counter(0);
        source.walk(50);
        // Raw (50) below baseline (1000): clamps instead of going negative
        assert_eq!(sub.current_steps(), 0);
        drop(sub);

        let sub2 = adapter.subscribe(0, 0, None).unwrap();
        assert_eq!(sub2.baseline(), 50);
        source.walk(30);
        assert_eq!(sub2.current_steps(), 30);
    }

    #[test]
    fn test_unsubscribe_invalidates_synchronously() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        let adapter = cumulative_adapter(&source);

        let mut sub = adapter.subscribe(0, 0, None).unwrap();
        source.walk(10);
        assert_eq!(sub.current_steps(), 10);
        sub.unsubscribe();
        sub.unsubscribe(); // idempotent

        // A late reading from the platform no longer applies
        source.walk(10);
        assert_eq!(sub.current_steps(), 10);
    }

    #[test]
    fn test_new_subscribe_invalidates_prior_generation() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        let adapter = cumulative_adapter(&source);

        let old = adapter.subscribe(0, 0, None).unwrap();
        let fresh = adapter.subscribe(0, 0, None).unwrap();

        source.walk(42);
        // Dropping the superseded handle must not tear down the live one
        drop(old);
        source.walk(8);
        assert_eq!(fresh.current_steps(), 50);
    }

    #[test]
    fn test_unavailable_sensor() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        source.set_available(false);
        let adapter = cumulative_adapter(&source);

        match adapter.subscribe(0, 0, None) {
            Err(TrackerError::SensorUnavailable) => {}
            other => panic!("expected SensorUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_denied_subscription_is_distinct() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        source.set_deny_subscriptions(true);
        let adapter = cumulative_adapter(&source);

        match adapter.subscribe(0, 0, None) {
            Err(TrackerError::PermissionDenied) => {}
            other => panic!("expected PermissionDenied, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_update_callback_reports_session_steps() {
        let source = Arc::new(SimulatedStepSource::cumulative());
        source.walk(700);
        let adapter = cumulative_adapter(&source);

        let seen = Arc::new(AtomicU64::new(0));
        let seen_in_cb = Arc::clone(&seen);
        let _sub = adapter
            .subscribe(
                0,
                0,
                Some(Box::new(move |steps| {
                    seen_in_cb.store(steps, Ordering::SeqCst);
                })),
            )
            .unwrap();

        source.walk(33);
        assert_eq!(seen.load(Ordering::SeqCst), 33);
    }
}
