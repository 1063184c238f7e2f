//! Error handling module for Stridewell.
//!
//! This module provides a unified error type using the `thiserror` crate,
//! consolidating all error types from various operations into a single enum.

use std::io;
use thiserror::Error;

/// Unified error type for the Stridewell tracking core.
///
/// Sensor and permission conditions are steady states the caller is expected
/// to surface to the user; persistence and background-registration failures
/// are degradations the session must survive.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The device has no usable step sensor (permanent for the device)
    #[error("step sensor unavailable on this device")]
    SensorUnavailable,

    /// Activity-recognition permission is denied (recoverable via re-request)
    #[error("activity permission denied")]
    PermissionDenied,

    /// Snapshot slot write failed
    #[error("snapshot write failed: {0}")]
    PersistenceWrite(String),

    /// Background wake-task registration failed
    #[error("background task registration failed: {0}")]
    BackgroundRegistration(String),

    /// Lock acquisition errors
    #[error("failed to acquire lock: {0}")]
    LockFailed(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic operation errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

// Helper implementations for common conversions
impl TrackerError {
    /// Create a snapshot-write error
    pub fn persistence(msg: impl Into<String>) -> Self {
        TrackerError::PersistenceWrite(msg.into())
    }

    /// Create a background-registration error
    pub fn background(msg: impl Into<String>) -> Self {
        TrackerError::BackgroundRegistration(msg.into())
    }

    /// Create a lock failure error
    pub fn lock(msg: impl Into<String>) -> Self {
        TrackerError::LockFailed(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        TrackerError::Config(msg.into())
    }

    /// Create a generic other error
    pub fn other(msg: impl Into<String>) -> Self {
        TrackerError::Other(msg.into())
    }
}

// Allow conversion from string for convenience
impl From<String> for TrackerError {
    fn from(s: String) -> Self {
        TrackerError::Other(s)
    }
}

impl From<&str> for TrackerError {
    fn from(s: &str) -> Self {
        TrackerError::Other(s.to_string())
    }
}
