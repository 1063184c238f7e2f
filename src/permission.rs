//! Sensor-permission state tracking.
//!
//! The gate sits in front of all sensor access: callers check
//! [`PermissionGate::state`] (or run [`PermissionGate::request_if_needed`])
//! before subscribing. A user flipping the OS setting is only ever observed
//! through an explicit re-query - the gate never assumes a `Denied ->
//! Granted` transition happened on its own.

use crate::error::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Permission status for the step sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Unknown,
    Granted,
    Denied,
}

/// The platform permission API.
pub trait PermissionPlatform: Send + Sync {
    /// Non-interactive status query.
    fn check(&self) -> PermissionState;

    /// Shows the OS permission prompt and waits for the outcome. Fails when
    /// the prompt is dismissed without a choice (e.g. the app is backgrounded
    /// mid-prompt).
    fn request(&self) -> Result<PermissionState>;
}

/// Serializes the check/request/grant/deny flow in front of sensor access.
pub struct PermissionGate {
    platform: Arc<dyn PermissionPlatform>,
    state: PermissionState,
}

impl PermissionGate {
    pub fn new(platform: Arc<dyn PermissionPlatform>) -> Self {
        PermissionGate {
            platform,
            state: PermissionState::Unknown,
        }
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn is_granted(&self) -> bool {
        self.state == PermissionState::Granted
    }

    /// Re-queries the platform; the only way `Denied -> Granted` is observed.
    pub fn refresh(&mut self) -> PermissionState {
        self.state = self.platform.check();
        debug!("permission re-check: {:?}", self.state);
        self.state
    }

    /// Triggers the OS prompt from `Unknown` or `Denied`; never re-prompts
    /// from `Granted`. A dismissed prompt leaves the state unchanged.
    pub fn request_if_needed(&mut self) -> PermissionState {
        if self.state == PermissionState::Granted {
            return self.state;
        }
        match self.platform.request() {
            Ok(outcome) => {
                self.state = outcome;
            }
            Err(e) => {
                warn!("permission prompt did not resolve: {}", e);
            }
        }
        self.state
    }
}
