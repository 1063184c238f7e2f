//! # Stridewell Tracker Library
//!
//! The persistent activity-tracking session core of the Stridewell wellness
//! app: accurate elapsed-time and step accounting for an exercise session
//! that survives app suspension, process death, and day rollover.
//!
//! ## Features
//!
//! - **Session Clock**: wall-clock-based elapsed time; the UI tick only
//!   refreshes a display and is never a time source
//! - **Sensor Normalization**: cumulative and reset-per-subscription step
//!   sensors behind one "steps since session start" adapter
//! - **Crash-Safe Persistence**: named-slot snapshots written on
//!   backgrounding and periodically, restored at process start
//! - **Lifecycle Coordination**: foreground/background transitions drive
//!   subscribe/unsubscribe with ordered snapshot writes
//! - **Daily Rollover**: coarse day polling that rolls the aggregate while
//!   preserving a live session
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stridewell::clock::SystemClock;
//! use stridewell::config::TrackerConfig;
//! use stridewell::controller::SessionController;
//! use stridewell::sensor::SensorMode;
//! use stridewell::sim::{ScriptedPermissionPlatform, SimBackgroundPlatform, SimulatedStepSource};
//! use stridewell::store::MemoryStore;
//!
//! let mut controller = SessionController::new(
//!     Arc::new(SystemClock),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SimulatedStepSource::cumulative()),
//!     SensorMode::Cumulative,
//!     Arc::new(ScriptedPermissionPlatform::granting()),
//!     Arc::new(SimBackgroundPlatform::allowing()),
//!     TrackerConfig::default(),
//! );
//! controller.restore_from_snapshot();
//! controller.start();
//! ```

#![doc(html_root_url = "https://docs.rs/stridewell/1.4.0")]

/// Background wake-task registration and the liveness stamp
pub mod background;
pub mod clock;
pub mod common;
/// Configuration management module for loading and saving settings
pub mod config;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod permission;
/// Retry logic with exponential backoff for transient failures
pub mod retry;
pub mod rollover;
pub mod sensor;
pub mod session;
pub mod session_clock;
/// Deterministic platform doubles for tests and the replay binary
pub mod sim;
pub mod store;
pub mod version;

pub use config::TrackerConfig;
pub use controller::{Continuity, SessionController, TrackerStatus};
pub use error::{Result, TrackerError};
pub use permission::PermissionState;
pub use sensor::SensorMode;
pub use session::{ActivitySummary, DailyAggregate, Session};
pub use store::PersistedSnapshot;
pub use version::{short_version, version_string};
