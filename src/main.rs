//! # Stridewell Tracker CLI
//!
//! Development harness for the activity-tracking session core. Reads a JSON
//! event script from stdin, drives the controller through it against
//! scripted platforms and a manual clock, and prints a JSON report - so
//! suspend/resume/rollover scenarios reproduce in microseconds, no device
//! needed.
//!
//! ## Usage
//!
//! ```bash
//! echo '{"events":[{"op":"start"},{"op":"walk","steps":100},{"op":"stop"}]}' | stridewell
//! ```

use clap::{Parser, Subcommand};
use log::warn;
use std::io::{self, Read};
use std::sync::Arc;

use stridewell::background::record_liveness;
use stridewell::clock::ManualClock;
use stridewell::config::{self, TrackerConfig};
use stridewell::controller::SessionController;
use stridewell::error::Result;
use stridewell::models::{ReplayReport, ReplayScript, SimEvent};
use stridewell::permission::PermissionState;
use stridewell::sensor::SensorMode;
use stridewell::sim::{
    local_noon_ms, ScriptedPermissionPlatform, SimBackgroundPlatform, SimulatedStepSource,
};
use stridewell::store::{read_liveness_stamp, FileStore, MemoryStore, PersistedSnapshot, SlotStore};
use stridewell::version::version_string;

/// Stridewell Tracker - replay harness for the session core
#[derive(Parser)]
#[command(name = "stridewell")]
#[command(version = env!("STRIDEWELL_VERSION"))]
#[command(about = "Replay harness for the Stridewell tracking core", long_about = None)]
#[command(
    after_help = "Input: Reads a JSON event script from stdin\n\nExample:\n  echo '{\"events\":[{\"op\":\"start\"},{\"op\":\"walk\",\"steps\":100}]}' | stridewell"
)]
struct Cli {
    /// Show detailed version information
    #[arg(long = "version-full")]
    version_full: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example config file
    GenerateConfig,

    /// Print the persisted snapshot slots from the data directory
    Inspect,
}

fn main() -> Result<()> {
    // Initialize logging with WARN level by default (can be overridden with RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Handle version-full flag
    if cli.version_full {
        print!("{}", version_string());
        return Ok(());
    }

    match cli.command {
        Some(Commands::GenerateConfig) => generate_config(),
        Some(Commands::Inspect) => inspect(),
        None => replay(),
    }
}

fn generate_config() -> Result<()> {
    let config_path = TrackerConfig::default_config_path()?;
    println!("Generating example config file at: {:?}", config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&config_path, TrackerConfig::example_toml())?;
    println!("Config file generated successfully!");
    println!("Edit {} to customize settings", config_path.display());
    Ok(())
}

fn inspect() -> Result<()> {
    let config = config::get_config();
    let store = FileStore::open_default(&config.store.slots_file)?;
    println!("Slot file: {}", store.path().display());

    match PersistedSnapshot::load(&store)? {
        Some(snap) => {
            println!("Session:");
            println!("  startedAtWallClock: {:?}", snap.started_at_wall_clock);
            println!("  accumulatedSeconds: {}", snap.accumulated_seconds);
            println!("  isActive:           {}", snap.is_active);
            println!("  steps:              {}", snap.session_steps);
            println!("Daily:");
            println!("  date:               {:?}", snap.daily_date);
            println!("  steps:              {}", snap.daily_steps);
            println!("  seconds:            {}", snap.daily_seconds);
        }
        None => println!("No persisted session."),
    }

    match read_liveness_stamp(&store)? {
        Some(stamp) => println!("Last background liveness stamp: {}", stamp),
        None => println!("No background liveness stamp."),
    }
    Ok(())
}

fn replay() -> Result<()> {
    // Read JSON from stdin
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    // Parse input
    let script: ReplayScript = match serde_json::from_str(&buffer) {
        Ok(script) => script,
        Err(e) => {
            warn!("Failed to parse JSON script: {}. Using an empty script.", e);
            ReplayScript::default()
        }
    };

    let report = run_script(&script);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_script(script: &ReplayScript) -> ReplayReport {
    let mode = match script.sensor_mode.as_deref() {
        None | Some("cumulative") => SensorMode::Cumulative,
        Some("reset_per_subscription") => SensorMode::ResetPerSubscription,
        Some(other) => {
            warn!("Unknown sensor_mode {:?}; using cumulative", other);
            SensorMode::Cumulative
        }
    };

    let source = Arc::new(match mode {
        SensorMode::Cumulative => SimulatedStepSource::cumulative(),
        SensorMode::ResetPerSubscription => SimulatedStepSource::reset_per_subscription(),
    });
    if script.initial_counter > 0 {
        source.reset_counter(script.initial_counter);
    }
    if script.history_supported == Some(false) {
        source.set_history_supported(false);
    }

    let permissions = Arc::new(match script.permission.as_deref() {
        None | Some("granted") => ScriptedPermissionPlatform::granting(),
        Some("denied") => ScriptedPermissionPlatform::denying(),
        Some("unknown") => ScriptedPermissionPlatform::dismissing(),
        Some(other) => {
            warn!("Unknown permission {:?}; using granted", other);
            ScriptedPermissionPlatform::granting()
        }
    });

    let background = Arc::new(if script.background_allowed == Some(false) {
        SimBackgroundPlatform::restricted()
    } else {
        SimBackgroundPlatform::allowing()
    });

    let clock = Arc::new(ManualClock::new(local_noon_ms()));
    let store = Arc::new(MemoryStore::new());
    for (key, value) in &script.initial_slots {
        if let Err(e) = store.put(key, value.clone()) {
            warn!("Failed to seed slot {}: {}", key, e);
        }
    }

    let mut controller = SessionController::new(
        clock.clone(),
        store.clone(),
        source.clone(),
        mode,
        permissions.clone(),
        background,
        config::get_config().clone(),
    );

    if script.restore {
        controller.restore_from_snapshot();
    }

    let mut last_summary = None;
    for event in &script.events {
        match event {
            SimEvent::Start => {
                controller.start();
            }
            SimEvent::Stop => {
                if let Some(summary) = controller.stop() {
                    last_summary = Some(summary);
                }
            }
            SimEvent::Reset => controller.reset(),
            SimEvent::AppPhase { phase } => controller.handle_app_event(*phase),
            SimEvent::AdvanceSecs { secs } => clock.advance_secs(*secs),
            SimEvent::Walk { steps } => source.walk(*steps),
            SimEvent::Tick => controller.on_tick(),
            SimEvent::PollRollover => controller.poll_rollover(),
            SimEvent::SetPermission { state } => {
                permissions.set_check_result(*state);
                if *state != PermissionState::Unknown {
                    permissions.set_request_result(*state);
                }
            }
            SimEvent::ResetCounter { to } => source.reset_counter(*to),
            SimEvent::BackgroundWake => record_liveness(store.as_ref(), clock.as_ref()),
        }
    }

    ReplayReport {
        display: controller.display_state(),
        permission: controller.permission_state(),
        last_summary,
        slots: store.dump(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_script_basic_session() {
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "initial_counter": 1000,
                "events": [
                    {"op": "start"},
                    {"op": "walk", "steps": 120},
                    {"op": "advance_secs", "secs": 90},
                    {"op": "stop"}
                ]
            }"#,
        )
        .unwrap();

        let report = run_script(&script);
        let summary = report.last_summary.unwrap();
        assert_eq!(summary.steps, 120);
        assert_eq!(summary.duration_seconds, 90);
        assert_eq!(report.display.session_steps, 120);
    }

    #[test]
    fn test_run_script_suspend_resume() {
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "initial_counter": 1000,
                "events": [
                    {"op": "start"},
                    {"op": "advance_secs", "secs": 60},
                    {"op": "app_phase", "phase": "background"},
                    {"op": "walk", "steps": 500},
                    {"op": "advance_secs", "secs": 540},
                    {"op": "app_phase", "phase": "foreground"},
                    {"op": "walk", "steps": 100}
                ]
            }"#,
        )
        .unwrap();

        let report = run_script(&script);
        assert_eq!(report.display.session_steps, 100);
        assert!(report.display.elapsed_seconds >= 600);
    }

    #[test]
    fn test_run_script_denied_permission() {
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "permission": "denied",
                "events": [{"op": "start"}, {"op": "walk", "steps": 50}]
            }"#,
        )
        .unwrap();

        let report = run_script(&script);
        assert_eq!(report.display.session_steps, 0);
        assert_eq!(report.permission, PermissionState::Denied);
    }

    #[test]
    fn test_run_script_background_wake_stamps_liveness() {
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "events": [
                    {"op": "start"},
                    {"op": "app_phase", "phase": "background"},
                    {"op": "advance_secs", "secs": 900},
                    {"op": "background_wake"}
                ]
            }"#,
        )
        .unwrap();

        let report = run_script(&script);
        assert!(report.slots.contains_key("lastBackgroundLivenessStamp"));
    }
}
