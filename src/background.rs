//! Background wake-task registration.
//!
//! While the app is suspended, a periodic OS wake task stamps a liveness
//! timestamp so continuity across long suspensions is observable. The wake
//! task is a best-effort continuity aid, not a guarantee: step/time
//! accounting never depends on it firing, and the task body writes only the
//! stamp slot - never the session counters - so it cannot race a
//! concurrently-resuming foreground session.

use crate::clock::Clock;
use crate::error::{Result, TrackerError};
use crate::store::{self, SlotStore};
use log::{debug, info, warn};
use std::sync::Arc;

/// Outcome of asking the OS to schedule the wake task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Ok,
    /// The OS restricts background execution for this app.
    Restricted,
    /// The user disabled background refresh.
    Denied,
}

/// The platform background-task scheduling API.
pub trait BackgroundTaskPlatform: Send + Sync {
    fn register(&self, task_id: &str, minimum_interval_secs: u64) -> RegistrationOutcome;
    fn unregister(&self, task_id: &str);
}

/// Registers and unregisters the periodic background wake task.
pub struct BackgroundRegistrar {
    platform: Arc<dyn BackgroundTaskPlatform>,
    task_id: String,
    minimum_interval_secs: u64,
    registered: bool,
}

impl BackgroundRegistrar {
    pub fn new(
        platform: Arc<dyn BackgroundTaskPlatform>,
        task_id: impl Into<String>,
        minimum_interval_secs: u64,
    ) -> Self {
        BackgroundRegistrar {
            platform,
            task_id: task_id.into(),
            minimum_interval_secs,
            registered: false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Registers the wake task. Idempotent: already-registered is a no-op.
    ///
    /// Failure means tracking degrades to foreground-only; callers inform the
    /// user and keep the session running.
    pub fn enable(&mut self) -> Result<()> {
        if self.registered {
            debug!("background task {} already registered", self.task_id);
            return Ok(());
        }
        match self
            .platform
            .register(&self.task_id, self.minimum_interval_secs)
        {
            RegistrationOutcome::Ok => {
                info!(
                    "background task {} registered (min interval {}s)",
                    self.task_id, self.minimum_interval_secs
                );
                self.registered = true;
                Ok(())
            }
            RegistrationOutcome::Restricted => Err(TrackerError::background(format!(
                "OS restricts background execution for task {}",
                self.task_id
            ))),
            RegistrationOutcome::Denied => Err(TrackerError::background(format!(
                "background refresh denied for task {}",
                self.task_id
            ))),
        }
    }

    /// Unregisters the wake task. Idempotent.
    pub fn disable(&mut self) {
        if self.registered {
            self.platform.unregister(&self.task_id);
            self.registered = false;
            debug!("background task {} unregistered", self.task_id);
        }
    }
}

/// The wake-task body: stamp liveness, touch nothing else.
///
/// Runs on an OS-scheduled invocation with no ordering relative to
/// foreground code. Errors are logged and swallowed; a missed stamp costs
/// nothing but observability.
pub fn record_liveness(store: &dyn SlotStore, clock: &dyn Clock) {
    if let Err(e) = store::write_liveness_stamp(store, clock.now_ms()) {
        warn!("background liveness stamp failed: {}", e);
    }
}
