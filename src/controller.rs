//! The session orchestrator.
//!
//! [`SessionController`] owns the session and daily-aggregate entities and
//! coordinates the permission gate, step-sensor adapter, session clock,
//! snapshot store, background registrar, and rollover scheduler. Sensor and
//! permission conditions surface to the UI as [`TrackerStatus`] state rather
//! than errors; persistence and background-registration failures degrade
//! (logged, advisory) without ever blocking the in-memory session.

use crate::background::{BackgroundRegistrar, BackgroundTaskPlatform};
use crate::clock::{Clock, Ticker};
use crate::common::format_duration;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::lifecycle::{AppPhase, LifecycleAction, LifecycleCoordinator};
use crate::permission::{PermissionGate, PermissionPlatform, PermissionState};
use crate::rollover::RolloverScheduler;
use crate::sensor::{SensorMode, StepSensorAdapter, StepSource, StepSubscription, StepUpdateFn};
use crate::session::{ActivitySummary, DailyAggregate, Session};
use crate::session_clock::SessionClock;
use crate::store::{PersistedSnapshot, SlotStore};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// What the tracking UI should currently present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerStatus {
    /// No tracking in progress; last session's values remain readable.
    Idle,
    Tracking,
    /// Permission is not granted; show the call-to-action, not an error.
    PermissionRequired,
    /// No usable sensor on this device; disable the tracking UI entirely.
    SensorUnavailable,
}

/// Whether background continuity is in effect for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Continuity {
    Full,
    /// Wake-task registration failed; advise keeping the app open.
    ForegroundOnly,
}

/// Display refresh callback; invoked by the UI ticker and on transitions
/// that must re-render immediately.
pub type RenderFn = Arc<dyn Fn() + Send + Sync>;

/// Everything a render pass needs, in one read.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayState {
    pub status: TrackerStatus,
    pub continuity: Continuity,
    pub elapsed_seconds: u64,
    pub elapsed_display: String,
    pub session_steps: u64,
    pub daily_steps: u64,
    pub daily_seconds: u64,
    pub daily_date: String,
    pub goal_steps: u64,
    pub goal_progress: f64,
}

/// Orchestrates one activity-tracking session and its daily aggregate.
pub struct SessionController {
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SlotStore>,
    adapter: StepSensorAdapter,
    gate: PermissionGate,
    registrar: BackgroundRegistrar,
    lifecycle: LifecycleCoordinator,
    rollover: RolloverScheduler,
    session_clock: SessionClock,
    subscription: Option<StepSubscription>,
    /// Session-relative steps at the last sync point; authoritative while
    /// no subscription is live.
    steps: u64,
    /// Cumulative baseline captured at the first subscription of the
    /// session; `None` until then and after the session is zeroed.
    baseline_at_start: Option<u64>,
    daily: DailyAggregate,
    /// The most recently closed day, kept for the submission flow.
    last_finalized_day: Option<DailyAggregate>,
    status: TrackerStatus,
    continuity: Continuity,
    on_render: Option<RenderFn>,
    ticker: Option<Ticker>,
    last_persist_ms: i64,
}

impl SessionController {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn SlotStore>,
        step_source: Arc<dyn StepSource>,
        sensor_mode: SensorMode,
        permission_platform: Arc<dyn PermissionPlatform>,
        background_platform: Arc<dyn BackgroundTaskPlatform>,
        config: TrackerConfig,
    ) -> Self {
        let today = clock.local_date();
        let registrar = BackgroundRegistrar::new(
            background_platform,
            config.background.task_id.clone(),
            config.background.minimum_interval_secs,
        );
        SessionController {
            adapter: StepSensorAdapter::new(step_source, sensor_mode),
            gate: PermissionGate::new(permission_platform),
            registrar,
            lifecycle: LifecycleCoordinator::new(),
            rollover: RolloverScheduler::new(today),
            session_clock: SessionClock::new(Arc::clone(&clock)),
            subscription: None,
            steps: 0,
            baseline_at_start: None,
            daily: DailyAggregate::new(today),
            last_finalized_day: None,
            status: TrackerStatus::Idle,
            continuity: Continuity::Full,
            on_render: None,
            ticker: None,
            last_persist_ms: 0,
            config,
            clock,
            store,
        }
    }

    /// Installs the display refresh callback driving the UI ticker.
    pub fn set_render_callback(&mut self, render: RenderFn) {
        self.on_render = Some(render);
    }

    // ---- read surface ----------------------------------------------------

    pub fn status(&self) -> TrackerStatus {
        self.status
    }

    pub fn continuity(&self) -> Continuity {
        self.continuity
    }

    pub fn permission_state(&self) -> PermissionState {
        self.gate.state()
    }

    /// Elapsed active seconds of the current session, derived from the wall
    /// clock on every call.
    pub fn elapsed_secs(&self) -> u64 {
        self.session_clock.elapsed_secs()
    }

    /// Steps attributed to the current session.
    pub fn current_steps(&self) -> u64 {
        match &self.subscription {
            Some(sub) => sub.current_steps(),
            None => self.steps,
        }
    }

    /// Today's steps: completed aggregate plus the live session.
    pub fn steps_today(&self) -> u64 {
        self.daily.total_steps + self.current_steps()
    }

    /// Today's active seconds: completed aggregate plus the live session.
    pub fn seconds_today(&self) -> u64 {
        self.daily.total_seconds + self.elapsed_secs()
    }

    /// Progress toward the daily step goal, clamped to `0.0..=1.0`.
    pub fn goal_progress(&self) -> f64 {
        let goal = self.config.tracking.daily_step_goal;
        if goal == 0 {
            return 1.0;
        }
        (self.steps_today() as f64 / goal as f64).min(1.0)
    }

    /// The session entity as the data model sees it.
    pub fn session_state(&self) -> Session {
        Session {
            started_at_wall_clock: self.session_clock.started_at_ms(),
            accumulated_seconds: self.session_clock.accumulated_secs(),
            steps_at_session_start: self.baseline_at_start.unwrap_or(0),
            current_steps: self.current_steps(),
            is_active: self.lifecycle.tracking_enabled() && self.subscription.is_some(),
        }
    }

    pub fn daily(&self) -> &DailyAggregate {
        &self.daily
    }

    /// The most recently closed day's totals, if a rollover has happened.
    pub fn last_finalized_day(&self) -> Option<&DailyAggregate> {
        self.last_finalized_day.as_ref()
    }

    pub fn display_state(&self) -> DisplayState {
        let elapsed = self.elapsed_secs();
        DisplayState {
            status: self.status,
            continuity: self.continuity,
            elapsed_seconds: elapsed,
            elapsed_display: format_duration(elapsed),
            session_steps: self.current_steps(),
            daily_steps: self.steps_today(),
            daily_seconds: self.seconds_today(),
            daily_date: self.daily.date.format("%Y-%m-%d").to_string(),
            goal_steps: self.config.tracking.daily_step_goal,
            goal_progress: self.goal_progress(),
        }
    }

    // ---- operations ------------------------------------------------------

    /// Starts (or resumes) tracking.
    ///
    /// Requires the permission gate to be `Granted`; otherwise the request
    /// flow is triggered and the start is deferred with
    /// [`TrackerStatus::PermissionRequired`]. An unavailable sensor yields a
    /// permanently disabled state instead of a retry loop.
    pub fn start(&mut self) -> TrackerStatus {
        if self.status == TrackerStatus::SensorUnavailable {
            return self.status;
        }
        if !self.adapter.is_available() {
            warn!("step sensor unavailable on this device; tracking disabled");
            self.status = TrackerStatus::SensorUnavailable;
            return self.status;
        }
        if self.gate.request_if_needed() != PermissionState::Granted {
            info!("tracking start deferred: permission is {:?}", self.gate.state());
            self.status = TrackerStatus::PermissionRequired;
            return self.status;
        }

        self.poll_rollover();
        self.session_clock.start();
        let actions = self.lifecycle.on_tracking_changed(true);
        self.run_actions(&actions);
        // Tracking may already have been enabled with the subscription down
        // (permission re-granted mid-session); bring it back up
        self.subscribe_sensor();
        if self.status == TrackerStatus::SensorUnavailable {
            return self.status;
        }

        if self.subscription.is_some() {
            self.status = TrackerStatus::Tracking;
            match self.registrar.enable() {
                Ok(()) => self.continuity = Continuity::Full,
                Err(e) => {
                    warn!("{}; tracking continues foreground-only", e);
                    self.continuity = Continuity::ForegroundOnly;
                }
            }
        }
        self.persist();
        self.status
    }

    /// Stops tracking and hands back the `{steps, duration}` pair for the
    /// activity-submission flow. Idempotent: a second stop returns `None`
    /// and changes nothing.
    pub fn stop(&mut self) -> Option<ActivitySummary> {
        if !self.lifecycle.tracking_enabled() {
            return None;
        }

        self.sync_steps();
        self.session_clock.pause();
        let actions = self.lifecycle.on_tracking_changed(false);
        self.run_actions(&actions);
        self.registrar.disable();

        if self.status != TrackerStatus::SensorUnavailable {
            self.status = TrackerStatus::Idle;
        }
        if self.lifecycle.phase() == AppPhase::Background {
            // The foreground path already wrote its snapshot via the
            // lifecycle actions
            self.persist();
        }

        Some(ActivitySummary {
            steps: self.steps,
            duration_seconds: self.session_clock.elapsed_secs(),
        })
    }

    /// User-confirmed destructive reset.
    ///
    /// Folds the discarded session into today's aggregate, zeroes the
    /// session, and - when tracking was on - restarts the clock and sensor
    /// at zero rather than leaving tracking silently off.
    pub fn reset(&mut self) {
        self.sync_steps();
        let elapsed = self.session_clock.elapsed_secs();
        self.daily.absorb(self.steps, elapsed);
        self.teardown_subscription();
        self.zero_session();

        if self.lifecycle.tracking_enabled() {
            self.session_clock.start();
            self.subscribe_sensor();
            self.persist();
        } else {
            if let Err(e) = PersistedSnapshot::clear_session(self.store.as_ref()) {
                warn!("failed to clear session slots: {}", e);
            }
            if let Err(e) = self.snapshot().save_daily(self.store.as_ref()) {
                warn!("failed to persist daily slots: {}", e);
            }
            self.last_persist_ms = self.clock.now_ms();
        }
        self.refresh_display();
    }

    /// Reconstructs the session from the persisted snapshot. Invoked once at
    /// process start, before any other operation.
    ///
    /// An active snapshot resumes immediately: elapsed time is re-derived
    /// from the persisted wall-clock fields (no tick needed), the permission
    /// state is re-queried, and subscriptions come back up. Time the app
    /// spent not running is never lost.
    pub fn restore_from_snapshot(&mut self) {
        let snap = match PersistedSnapshot::load(self.store.as_ref()) {
            Ok(Some(snap)) => snap,
            Ok(None) => {
                debug!("no persisted session; starting fresh");
                return;
            }
            Err(e) => {
                warn!("failed to load snapshot: {}; starting fresh", e);
                return;
            }
        };

        self.steps = snap.session_steps;
        self.session_clock
            .restore(snap.accumulated_seconds, snap.started_at_wall_clock);
        let date = snap.daily_date.unwrap_or_else(|| self.clock.local_date());
        self.daily = DailyAggregate {
            date,
            total_steps: snap.daily_steps,
            total_seconds: snap.daily_seconds,
        };
        self.rollover = RolloverScheduler::new(date);
        info!(
            "restored session: steps={} accumulated={}s active={}",
            snap.session_steps, snap.accumulated_seconds, snap.is_active
        );

        if !snap.is_active {
            self.status = TrackerStatus::Idle;
            self.poll_rollover();
            return;
        }

        // The calendar day may have rolled while the process was dead
        self.poll_rollover();
        self.gate.refresh();
        self.session_clock.start();
        let actions = self.lifecycle.on_tracking_changed(true);
        self.run_actions(&actions);

        if self.subscription.is_some() {
            self.status = TrackerStatus::Tracking;
            match self.registrar.enable() {
                Ok(()) => self.continuity = Continuity::Full,
                Err(e) => {
                    warn!("{}; tracking continues foreground-only", e);
                    self.continuity = Continuity::ForegroundOnly;
                }
            }
        } else if self.status != TrackerStatus::SensorUnavailable {
            // Clock keeps running; steps resume once permission comes back
            self.status = TrackerStatus::PermissionRequired;
        }
        self.persist();
    }

    /// Applies a foreground/background transition from the app-lifecycle
    /// signal.
    pub fn handle_app_event(&mut self, phase: AppPhase) {
        if phase == AppPhase::Foreground {
            // The user may have flipped the OS permission setting while away
            self.gate.refresh();
        }
        let actions = self.lifecycle.on_phase_change(phase);
        self.run_actions(&actions);

        if phase == AppPhase::Foreground && self.lifecycle.tracking_enabled() {
            if self.subscription.is_some() {
                self.status = TrackerStatus::Tracking;
            }
            self.poll_rollover();
        }

        debug_assert!(
            self.lifecycle.phase() != AppPhase::Background
                || self.subscription.is_none()
                || self.registrar.is_registered(),
            "sensor subscribed while backgrounded without background continuation"
        );
    }

    /// Checks for a calendar-day change and rolls the aggregate.
    ///
    /// An active session survives rollover: its counters are folded into the
    /// outgoing day, zeroed, and tracking continues into the new day with a
    /// fresh sensor baseline. Driven on the rollover poll cadence,
    /// independent of app state.
    pub fn poll_rollover(&mut self) {
        let today = self.clock.local_date();
        let change = match self.rollover.check(today) {
            Some(change) => change,
            None => return,
        };

        self.sync_steps();
        let outgoing = DailyAggregate {
            date: change.from,
            total_steps: self.daily.total_steps + self.steps,
            total_seconds: self.daily.total_seconds + self.session_clock.elapsed_secs(),
        };
        info!(
            "closing day {}: {} steps, {}s active",
            outgoing.date, outgoing.total_steps, outgoing.total_seconds
        );
        self.last_finalized_day = Some(outgoing);

        self.daily = DailyAggregate::new(change.to);
        let was_running = self.session_clock.is_running();
        self.zero_session();
        if was_running {
            self.session_clock.start();
        }

        if self.subscription.is_some() {
            // New generation with a zero base and a fresh baseline; this
            // also absorbs OS counters that reset at midnight
            self.teardown_subscription();
            self.subscribe_sensor();
        }
        self.persist();
    }

    /// UI tick entry point: rides periodic persistence on the display
    /// refresh cadence. Never a source of elapsed time.
    pub fn on_tick(&mut self) {
        if !self.lifecycle.tracking_enabled() {
            return;
        }
        let now = self.clock.now_ms();
        let interval_ms = self.config.tracking.snapshot_interval_secs as i64 * 1000;
        if now - self.last_persist_ms >= interval_ms {
            self.persist();
        }
    }

    // ---- internals -------------------------------------------------------

    fn run_actions(&mut self, actions: &[LifecycleAction]) {
        for action in actions {
            match action {
                LifecycleAction::WriteSnapshot => self.persist(),
                LifecycleAction::StopTicker => self.stop_ticker(),
                LifecycleAction::UnsubscribeSensor => {
                    self.sync_steps();
                    self.teardown_subscription();
                }
                LifecycleAction::RecomputeElapsed => self.refresh_display(),
                LifecycleAction::StartTicker => self.start_ticker(),
                LifecycleAction::ResubscribeSensor => self.subscribe_sensor(),
            }
        }
    }

    fn subscribe_sensor(&mut self) {
        if self.subscription.is_some() || !self.lifecycle.should_be_subscribed() {
            return;
        }
        if !self.gate.is_granted() {
            self.status = TrackerStatus::PermissionRequired;
            return;
        }

        let on_update: Option<StepUpdateFn> = self.on_render.as_ref().map(|render| {
            let render = Arc::clone(render);
            Box::new(move |_steps: u64| render()) as StepUpdateFn
        });

        match self
            .adapter
            .subscribe(self.steps, self.clock.now_ms(), on_update)
        {
            Ok(sub) => {
                if self.baseline_at_start.is_none() {
                    self.baseline_at_start = Some(sub.baseline());
                }
                self.subscription = Some(sub);
            }
            Err(TrackerError::SensorUnavailable) => {
                warn!("step sensor became unavailable; tracking disabled");
                self.disable_tracking(TrackerStatus::SensorUnavailable);
            }
            Err(TrackerError::PermissionDenied) => {
                // Revoked under us; keep the clock running so no time is
                // lost once the user re-grants
                self.gate.refresh();
                self.status = TrackerStatus::PermissionRequired;
            }
            Err(e) => warn!("sensor subscription failed: {}", e),
        }
    }

    fn disable_tracking(&mut self, status: TrackerStatus) {
        self.sync_steps();
        self.session_clock.pause();
        let actions = self.lifecycle.on_tracking_changed(false);
        self.run_actions(&actions);
        self.registrar.disable();
        self.status = status;
    }

    /// Copies the live step count out of the subscription cell; the frozen
    /// copy is authoritative whenever no subscription is live.
    fn sync_steps(&mut self) {
        if let Some(sub) = &self.subscription {
            self.steps = sub.current_steps();
        }
    }

    fn teardown_subscription(&mut self) {
        if let Some(mut sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }

    fn zero_session(&mut self) {
        self.steps = 0;
        self.baseline_at_start = None;
        self.session_clock.reset();
    }

    fn start_ticker(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        if let Some(render) = &self.on_render {
            let render = Arc::clone(render);
            self.ticker = Some(Ticker::spawn(
                Duration::from_millis(self.config.tracking.tick_interval_ms),
                move || render(),
            ));
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn refresh_display(&self) {
        if let Some(render) = &self.on_render {
            render();
        }
    }

    fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            started_at_wall_clock: self.session_clock.started_at_ms(),
            accumulated_seconds: self.session_clock.accumulated_secs(),
            // Records user intent so a restore resumes the session even
            // though the subscription itself is down while suspended
            is_active: self.lifecycle.tracking_enabled(),
            session_steps: self.current_steps(),
            daily_steps: self.daily.total_steps,
            daily_seconds: self.daily.total_seconds,
            daily_date: Some(self.daily.date),
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.snapshot().save(self.store.as_ref()) {
            warn!("snapshot write failed: {}; tracking continues", e);
        }
        self.last_persist_ms = self.clock.now_ms();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Release the ticker and invalidate any live subscription on every
        // exit path
        self.stop_ticker();
        self.teardown_subscription();
    }
}

/// Spawns the coarse rollover poll, driving
/// [`SessionController::poll_rollover`] at the configured cadence regardless
/// of app state. The returned [`Ticker`] owns the poll; drop it to stop.
pub fn spawn_rollover_poller(
    controller: Arc<std::sync::Mutex<SessionController>>,
    interval: Duration,
) -> Ticker {
    Ticker::spawn(interval, move || {
        if let Ok(mut controller) = controller.lock() {
            controller.poll_rollover();
        }
    })
}
