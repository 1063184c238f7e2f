//! App-lifecycle transitions mapped to ordered tracking actions.
//!
//! The coordinator is a pure state machine over two inputs - app phase and
//! tracking-enabled - with one derived state: the sensor is subscribed iff
//! the app is foregrounded *and* tracking is enabled. Transitions return the
//! actions the controller must run, in order. Ordering carries correctness:
//! the snapshot write is issued before the sensor is unsubscribed (a crash
//! mid-backgrounding loses at most the unsaved interval), and on
//! foregrounding elapsed time is recomputed before the ticker resumes so the
//! display never shows a stale duration for a frame.

use serde::{Deserialize, Serialize};

/// Foreground/background phase, as emitted by the app-lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    Foreground,
    Background,
}

/// One step the controller must execute for a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    WriteSnapshot,
    StopTicker,
    UnsubscribeSensor,
    RecomputeElapsed,
    StartTicker,
    ResubscribeSensor,
}

/// Tracks (phase, tracking-enabled) and derives subscribe/unsubscribe work.
#[derive(Debug, Clone)]
pub struct LifecycleCoordinator {
    phase: AppPhase,
    tracking_enabled: bool,
}

impl Default for LifecycleCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleCoordinator {
    pub fn new() -> Self {
        LifecycleCoordinator {
            phase: AppPhase::Foreground,
            tracking_enabled: false,
        }
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    /// Whether the sensor subscription should currently be live.
    pub fn should_be_subscribed(&self) -> bool {
        self.phase == AppPhase::Foreground && self.tracking_enabled
    }

    /// Applies a foreground/background transition.
    pub fn on_phase_change(&mut self, phase: AppPhase) -> Vec<LifecycleAction> {
        if phase == self.phase {
            return Vec::new();
        }
        self.phase = phase;

        if !self.tracking_enabled {
            return Vec::new();
        }

        match phase {
            // Snapshot is issued before the unsubscribe; see module docs.
            AppPhase::Background => vec![
                LifecycleAction::WriteSnapshot,
                LifecycleAction::StopTicker,
                LifecycleAction::UnsubscribeSensor,
            ],
            AppPhase::Foreground => vec![
                LifecycleAction::RecomputeElapsed,
                LifecycleAction::StartTicker,
                LifecycleAction::ResubscribeSensor,
            ],
        }
    }

    /// Applies the user enabling or disabling tracking.
    pub fn on_tracking_changed(&mut self, enabled: bool) -> Vec<LifecycleAction> {
        if enabled == self.tracking_enabled {
            return Vec::new();
        }
        self.tracking_enabled = enabled;

        match (enabled, self.phase) {
            (true, AppPhase::Foreground) => vec![
                LifecycleAction::StartTicker,
                LifecycleAction::ResubscribeSensor,
            ],
            // Enabled while backgrounded: nothing to do until foregrounding
            (true, AppPhase::Background) => Vec::new(),
            (false, AppPhase::Foreground) => vec![
                LifecycleAction::WriteSnapshot,
                LifecycleAction::StopTicker,
                LifecycleAction::UnsubscribeSensor,
            ],
            // Disabled while backgrounded: unsubscribe immediately, no
            // further snapshots needed
            (false, AppPhase::Background) => vec![
                LifecycleAction::StopTicker,
                LifecycleAction::UnsubscribeSensor,
            ],
        }
    }
}
