//! End-to-end session scenarios against scripted platforms.
//!
//! These exercise the whole controller stack - permission gate, sensor
//! adapter, session clock, lifecycle coordination, persistence - through
//! the situations a phone actually produces: suspensions, baseline
//! refreshes, revoked permissions, repeated stops.


use std::sync::Arc;
use stridewell::clock::ManualClock;
use stridewell::config::TrackerConfig;
use stridewell::controller::SessionController;
use stridewell::lifecycle::AppPhase;
use stridewell::sensor::SensorMode;
use stridewell::sim::{
    local_noon_ms, ScriptedPermissionPlatform, SimBackgroundPlatform, SimulatedStepSource,
};
use stridewell::store::MemoryStore;
use stridewell::{PermissionState, TrackerStatus};

struct Rig {
    clock: Arc<ManualClock>,
    store: Arc<MemoryStore>,
    source: Arc<SimulatedStepSource>,
    permissions: Arc<ScriptedPermissionPlatform>,
    controller: SessionController,
}

fn rig(mode: SensorMode, permissions: ScriptedPermissionPlatform) -> Rig {
    let _guard = test_support::init();

    let clock = Arc::new(ManualClock::new(local_noon_ms()));
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(match mode {
        SensorMode::Cumulative => SimulatedStepSource::cumulative(),
        SensorMode::ResetPerSubscription => SimulatedStepSource::reset_per_subscription(),
    });
    let permissions = Arc::new(permissions);
    let controller = SessionController::new(
        clock.clone(),
        store.clone(),
        source.clone(),
        mode,
        permissions.clone(),
        Arc::new(SimBackgroundPlatform::allowing()),
        TrackerConfig::default(),
    );
    Rig {
        clock,
        store,
        source,
        permissions,
        controller,
    }
}

/// User starts at T=0 with 1000 cumulative pre-session steps, backgrounds at
/// T=60s, foregrounds at T=600s after 500 unseen steps, then walks 100 more:
/// the fresh baseline (1500) keeps the session at exactly 100 steps with no
/// spurious spike, and elapsed covers the whole 600s.
#[test]
fn cumulative_resume_uses_fresh_baseline() {
    let mut r = rig(
        SensorMode::Cumulative,
        ScriptedPermissionPlatform::granting(),
    );
    r.source.walk(1000);

    assert_eq!(r.controller.start(), TrackerStatus::Tracking);
    r.clock.advance_secs(60);
    r.controller.handle_app_event(AppPhase::Background);

    r.source.walk(500); // counter now 1500, session unsubscribed
    r.clock.advance_secs(540);
    r.controller.handle_app_event(AppPhase::Foreground);

    r.source.walk(100); // counter 1600 against fresh baseline 1500
    assert_eq!(r.controller.current_steps(), 100);
    assert!(r.controller.elapsed_secs() >= 600);
}

#[test]
fn reset_per_subscription_resume_carries_base() {
    let mut r = rig(
        SensorMode::ResetPerSubscription,
        ScriptedPermissionPlatform::granting(),
    );
    r.controller.start();
    r.source.walk(250);
    assert_eq!(r.controller.current_steps(), 250);

    r.controller.handle_app_event(AppPhase::Background);
    r.controller.handle_app_event(AppPhase::Foreground);

    // The new subscription counts from zero; prior steps stay attributed
    r.source.walk(50);
    assert_eq!(r.controller.current_steps(), 300);
}

#[test]
fn background_then_immediate_foreground_changes_nothing() {
    let mut r = rig(
        SensorMode::Cumulative,
        ScriptedPermissionPlatform::granting(),
    );
    r.controller.start();
    r.source.walk(333);
    r.clock.advance_secs(77);

    let steps_before = r.controller.current_steps();
    let elapsed_before = r.controller.elapsed_secs();

    // Zero elapsed real time between the transitions
    r.controller.handle_app_event(AppPhase::Background);
    r.controller.handle_app_event(AppPhase::Foreground);

    assert_eq!(r.controller.current_steps(), steps_before);
    assert_eq!(r.controller.elapsed_secs(), elapsed_before);
}

#[test]
fn stop_twice_yields_same_accumulated_seconds() {
    let mut r = rig(
        SensorMode::Cumulative,
        ScriptedPermissionPlatform::granting(),
    );
    r.controller.start();
    r.clock.advance_secs(120);

    let first = r.controller.stop().unwrap();
    assert_eq!(first.duration_seconds, 120);

    r.clock.advance_secs(999);
    assert!(r.controller.stop().is_none());
    assert_eq!(r.controller.elapsed_secs(), 120);
}

/// Ticks only refresh a display; firing many or none must not change
/// elapsed time.
#[test]
fn tick_frequency_does_not_affect_elapsed() {
    let mut with_ticks = rig(
        SensorMode::Cumulative,
        ScriptedPermissionPlatform::granting(),
    );
    with_ticks.controller.start();
    for _ in 0..50 {
        with_ticks.clock.advance_secs(2);
        with_ticks.controller.on_tick();
    }

    let mut without_ticks = rig(
        SensorMode::Cumulative,
        ScriptedPermissionPlatform::granting(),
    );
    without_ticks.controller.start();
    without_ticks.clock.advance_secs(100);

    assert_eq!(
        with_ticks.controller.elapsed_secs(),
        without_ticks.controller.elapsed_secs()
    );
}

/// Denied permission: start surfaces the state, attempts no subscription,
/// and does not crash.
#[test]
fn denied_permission_start_surfaces_state() {
    let mut r = rig(SensorMode::Cumulative, ScriptedPermissionPlatform::denying());

    assert_eq!(r.controller.start(), TrackerStatus::PermissionRequired);
    assert_eq!(r.controller.permission_state(), PermissionState::Denied);
    assert!(!r.controller.session_state().is_active);

    // Movement is not attributed to anything
    r.source.walk(400);
    assert_eq!(r.controller.current_steps(), 0);
}

#[test]
fn permission_granted_after_denial_starts_cleanly() {
    let mut r = rig(SensorMode::Cumulative, ScriptedPermissionPlatform::denying());
    assert_eq!(r.controller.start(), TrackerStatus::PermissionRequired);

    r.permissions.set_request_result(PermissionState::Granted);
    assert_eq!(r.controller.start(), TrackerStatus::Tracking);
    r.source.walk(12);
    assert_eq!(r.controller.current_steps(), 12);
}

#[test]
fn backgrounding_snapshot_has_live_counters() {
    let mut r = rig(
        SensorMode::Cumulative,
        ScriptedPermissionPlatform::granting(),
    );
    r.controller.start();
    r.source.walk(88);
    r.clock.advance_secs(44);
    r.controller.handle_app_event(AppPhase::Background);

    let dump = r.store.dump();
    assert_eq!(dump.get("session.steps").map(String::as_str), Some("88"));
    assert_eq!(dump.get("session.isActive").map(String::as_str), Some("true"));
    assert!(dump.contains_key("session.startedAtWallClock"));
}

#[test]
fn dismissed_prompt_leaves_start_deferred() {
    let mut r = rig(
        SensorMode::Cumulative,
        ScriptedPermissionPlatform::dismissing(),
    );
    // Prompt dismissed without a choice: no crash, state stays unknown
    assert_eq!(r.controller.start(), TrackerStatus::PermissionRequired);
    assert_eq!(r.controller.permission_state(), PermissionState::Unknown);
}
