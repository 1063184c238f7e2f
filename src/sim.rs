//! Deterministic platform doubles.
//!
//! The production widget ships against real sensor, permission, and
//! background-task APIs; development and tests run against these scripted
//! stand-ins instead. The replay binary wires them to a [`ManualClock`] so a
//! whole suspend/resume/rollover scenario executes in microseconds.
//!
//! [`ManualClock`]: crate::clock::ManualClock

use crate::background::{BackgroundTaskPlatform, RegistrationOutcome};
use crate::error::{Result, TrackerError};
use crate::permission::{PermissionPlatform, PermissionState};
use crate::sensor::{HistoricalSteps, RawReadingFn, SensorMode, SourceHandle, StepSource};
use chrono::{Local, LocalResult, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Epoch milliseconds of today's local noon.
///
/// Scenario clocks seeded here can advance for hours in either direction
/// without accidentally crossing a midnight.
pub fn local_noon_ms() -> i64 {
    let noon = Local::now().date_naive().and_hms_opt(12, 0, 0).unwrap();
    match Local.from_local_datetime(&noon) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(dt, _) => dt.timestamp_millis(),
        LocalResult::None => Utc::now().timestamp_millis(),
    }
}

/// A scripted pedometer covering both platform counting contracts.
///
/// [`walk`] moves the simulated wearer: the internal cumulative counter
/// advances and the current subscriber (if any) receives a raw reading in
/// the source's native semantics.
///
/// [`walk`]: SimulatedStepSource::walk
pub struct SimulatedStepSource {
    mode: SensorMode,
    available: AtomicBool,
    deny_subscriptions: AtomicBool,
    history_supported: AtomicBool,
    /// Steps since an arbitrary reference, like a real cumulative counter.
    counter: AtomicU64,
    /// Counter value when the current subscription was installed.
    sub_base: AtomicU64,
    /// Current subscriber, keyed by a per-subscription token so a stale
    /// handle cannot cancel its successor.
    callback: Arc<Mutex<Option<(u64, RawReadingFn)>>>,
    next_token: AtomicU64,
}

impl SimulatedStepSource {
    pub fn cumulative() -> Self {
        Self::with_mode(SensorMode::Cumulative)
    }

    pub fn reset_per_subscription() -> Self {
        Self::with_mode(SensorMode::ResetPerSubscription)
    }

    fn with_mode(mode: SensorMode) -> Self {
        SimulatedStepSource {
            mode,
            available: AtomicBool::new(true),
            deny_subscriptions: AtomicBool::new(false),
            history_supported: AtomicBool::new(true),
            counter: AtomicU64::new(0),
            sub_base: AtomicU64::new(0),
            callback: Arc::new(Mutex::new(None)),
            next_token: AtomicU64::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_history_supported(&self, supported: bool) {
        self.history_supported.store(supported, Ordering::SeqCst);
    }

    /// Makes subscription attempts fail with `PermissionDenied`.
    pub fn set_deny_subscriptions(&self, deny: bool) {
        self.deny_subscriptions.store(deny, Ordering::SeqCst);
    }

    /// Simulates the OS resetting the cumulative counter (e.g. at midnight
    /// or after a reboot).
    pub fn reset_counter(&self, to: u64) {
        self.counter.store(to, Ordering::SeqCst);
    }

    /// Takes `steps` steps and delivers a raw reading to the subscriber.
    pub fn walk(&self, steps: u64) {
        let total = self.counter.fetch_add(steps, Ordering::SeqCst) + steps;
        let raw = match self.mode {
            SensorMode::Cumulative => total,
            SensorMode::ResetPerSubscription => {
                total.saturating_sub(self.sub_base.load(Ordering::SeqCst))
            }
        };
        let callback = self.callback.lock().expect("callback slot poisoned");
        if let Some((_, on_reading)) = callback.as_ref() {
            on_reading(raw);
        }
    }
}

impl StepSource for SimulatedStepSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn subscribe(&self, on_reading: RawReadingFn) -> Result<SourceHandle> {
        if !self.is_available() {
            return Err(TrackerError::SensorUnavailable);
        }
        if self.deny_subscriptions.load(Ordering::SeqCst) {
            return Err(TrackerError::PermissionDenied);
        }

        self.sub_base
            .store(self.counter.load(Ordering::SeqCst), Ordering::SeqCst);
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        *self.callback.lock().expect("callback slot poisoned") = Some((token, on_reading));

        let slot = Arc::clone(&self.callback);
        Ok(SourceHandle::new(move || {
            let mut callback = slot.lock().expect("callback slot poisoned");
            let still_current = callback
                .as_ref()
                .map(|(current, _)| *current == token)
                .unwrap_or(false);
            if still_current {
                *callback = None;
            }
        }))
    }

    fn query_historical_steps(&self, _since_ms: i64, _until_ms: i64) -> HistoricalSteps {
        if self.history_supported.load(Ordering::SeqCst) {
            HistoricalSteps::Steps(self.counter.load(Ordering::SeqCst))
        } else {
            HistoricalSteps::Unsupported
        }
    }
}

/// A permission platform with scripted answers.
pub struct ScriptedPermissionPlatform {
    check_result: Mutex<PermissionState>,
    /// `None` scripts a prompt dismissed without a choice.
    request_result: Mutex<Option<PermissionState>>,
    request_count: AtomicU32,
}

impl ScriptedPermissionPlatform {
    pub fn granting() -> Self {
        Self::scripted(PermissionState::Granted, Some(PermissionState::Granted))
    }

    pub fn denying() -> Self {
        Self::scripted(PermissionState::Denied, Some(PermissionState::Denied))
    }

    pub fn dismissing() -> Self {
        Self::scripted(PermissionState::Unknown, None)
    }

    fn scripted(check: PermissionState, request: Option<PermissionState>) -> Self {
        ScriptedPermissionPlatform {
            check_result: Mutex::new(check),
            request_result: Mutex::new(request),
            request_count: AtomicU32::new(0),
        }
    }

    pub fn set_check_result(&self, state: PermissionState) {
        *self.check_result.lock().expect("check slot poisoned") = state;
    }

    pub fn set_request_result(&self, state: PermissionState) {
        *self.request_result.lock().expect("request slot poisoned") = Some(state);
    }

    pub fn request_count(&self) -> u32 {
        self.request_count.load(Ordering::SeqCst)
    }
}

impl PermissionPlatform for ScriptedPermissionPlatform {
    fn check(&self) -> PermissionState {
        *self.check_result.lock().expect("check slot poisoned")
    }

    fn request(&self) -> Result<PermissionState> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        match *self.request_result.lock().expect("request slot poisoned") {
            Some(outcome) => {
                // The OS records the choice; subsequent checks agree
                *self.check_result.lock().expect("check slot poisoned") = outcome;
                Ok(outcome)
            }
            None => Err(TrackerError::other("permission prompt dismissed")),
        }
    }
}

/// A background-task platform with a scripted registration outcome.
pub struct SimBackgroundPlatform {
    outcome: Mutex<RegistrationOutcome>,
    registered: AtomicBool,
    register_count: AtomicU32,
    unregister_count: AtomicU32,
}

impl SimBackgroundPlatform {
    pub fn allowing() -> Self {
        Self::with_outcome(RegistrationOutcome::Ok)
    }

    pub fn restricted() -> Self {
        Self::with_outcome(RegistrationOutcome::Restricted)
    }

    pub fn denying() -> Self {
        Self::with_outcome(RegistrationOutcome::Denied)
    }

    fn with_outcome(outcome: RegistrationOutcome) -> Self {
        SimBackgroundPlatform {
            outcome: Mutex::new(outcome),
            registered: AtomicBool::new(false),
            register_count: AtomicU32::new(0),
            unregister_count: AtomicU32::new(0),
        }
    }

    pub fn set_outcome(&self, outcome: RegistrationOutcome) {
        *self.outcome.lock().expect("outcome slot poisoned") = outcome;
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn register_count(&self) -> u32 {
        self.register_count.load(Ordering::SeqCst)
    }

    pub fn unregister_count(&self) -> u32 {
        self.unregister_count.load(Ordering::SeqCst)
    }
}

impl BackgroundTaskPlatform for SimBackgroundPlatform {
    fn register(&self, _task_id: &str, _minimum_interval_secs: u64) -> RegistrationOutcome {
        self.register_count.fetch_add(1, Ordering::SeqCst);
        let outcome = *self.outcome.lock().expect("outcome slot poisoned");
        if outcome == RegistrationOutcome::Ok {
            self.registered.store(true, Ordering::SeqCst);
        }
        outcome
    }

    fn unregister(&self, _task_id: &str) {
        self.unregister_count.fetch_add(1, Ordering::SeqCst);
        self.registered.store(false, Ordering::SeqCst);
    }
}
