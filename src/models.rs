//! Data models for the replay harness.
//!
//! The `stridewell` binary reads a JSON event script from stdin, drives the
//! session controller through it, and prints a report. These are the
//! input/output structures of that surface.

use crate::controller::DisplayState;
use crate::lifecycle::AppPhase;
use crate::permission::PermissionState;
use crate::session::ActivitySummary;
use serde::{Deserialize, Serialize};

/// One scripted event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SimEvent {
    /// User taps start.
    Start,
    /// User taps stop.
    Stop,
    /// User confirms a reset.
    Reset,
    /// App-lifecycle transition.
    AppPhase { phase: AppPhase },
    /// Wall clock advances (suspension, waiting, crossing midnight).
    AdvanceSecs { secs: i64 },
    /// The wearer takes steps; delivered in the sensor's native semantics.
    Walk { steps: u64 },
    /// One UI refresh tick.
    Tick,
    /// One rollover poll.
    PollRollover,
    /// The OS permission setting changes out from under the app.
    SetPermission { state: PermissionState },
    /// The OS resets the cumulative step counter.
    ResetCounter { to: u64 },
    /// The background wake task fires.
    BackgroundWake,
}

/// A full replay script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    /// Sensor mode for the scripted platform: "cumulative" (default) or
    /// "reset_per_subscription".
    pub sensor_mode: Option<String>,
    /// Initial cumulative counter value (pre-session history).
    pub initial_counter: u64,
    /// Whether the platform answers historical queries (default true).
    pub history_supported: Option<bool>,
    /// Initial permission check result: "granted" (default), "denied",
    /// or "unknown".
    pub permission: Option<String>,
    /// Whether background registration succeeds (default true).
    pub background_allowed: Option<bool>,
    /// Slot contents seeded into the store before the replay begins, for
    /// exercising restore paths.
    pub initial_slots: std::collections::BTreeMap<String, String>,
    /// Restore from a snapshot in the slot store before replaying.
    pub restore: bool,
    pub events: Vec<SimEvent>,
}

/// What the replay prints when the script ends.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub display: DisplayState,
    pub permission: PermissionState,
    /// Hand-off pair from the last `stop`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_summary: Option<ActivitySummary>,
    /// Final slot-store contents, for inspecting persistence behavior.
    pub slots: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_parses() {
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "initial_counter": 1000,
                "events": [
                    {"op": "start"},
                    {"op": "walk", "steps": 100},
                    {"op": "advance_secs", "secs": 60},
                    {"op": "app_phase", "phase": "background"},
                    {"op": "app_phase", "phase": "foreground"},
                    {"op": "stop"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(script.initial_counter, 1000);
        assert_eq!(script.events.len(), 6);
        assert!(matches!(script.events[1], SimEvent::Walk { steps: 100 }));
    }

    #[test]
    fn test_empty_script_defaults() {
        let script: ReplayScript = serde_json::from_str("{}").unwrap();
        assert!(script.events.is_empty());
        assert!(!script.restore);
        assert_eq!(script.sensor_mode, None);
    }

    #[test]
    fn test_set_permission_event_parses() {
        let script: ReplayScript = serde_json::from_str(
            r#"{"events": [{"op": "set_permission", "state": "denied"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            script.events[0],
            SimEvent::SetPermission {
                state: PermissionState::Denied
            }
        ));
    }
}
