//! Retry logic module.
//!
//! This module provides retry functionality with exponential backoff for
//! handling transient failures in slot-file operations.

use crate::config;
use crate::error::{Result, TrackerError};
use log::debug;
use std::thread;
use std::time::Duration;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Factor to multiply delay by after each attempt (for exponential backoff)
    pub backoff_factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

impl From<&config::RetrySettings> for RetryConfig {
    fn from(settings: &config::RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts,
            initial_delay_ms: settings.initial_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            backoff_factor: settings.backoff_factor,
        }
    }
}

impl RetryConfig {
    /// Quick configuration for file operations (from config)
    pub fn for_file_ops() -> Self {
        let app_config = config::get_config();
        Self::from(&app_config.retry.file_ops)
    }
}

/// Retry a fallible operation with exponential backoff
pub fn retry_with_backoff<F, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut current_delay = config.initial_delay_ms;
    let mut last_error = None;

    for attempt in 1..=config.max_attempts {
        match operation() {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = Some(e);

                // Don't sleep after the last attempt
                if attempt < config.max_attempts {
                    debug!(
                        "Attempt {}/{} failed, retrying in {}ms...",
                        attempt, config.max_attempts, current_delay
                    );

                    thread::sleep(Duration::from_millis(current_delay));

                    current_delay = ((current_delay as f32 * config.backoff_factor) as u64)
                        .min(config.max_delay_ms);
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| TrackerError::other("Retry failed with no error information")))
}
