//! Common utilities shared across modules.
//!
//! This module provides shared functionality to reduce code duplication
//! and ensure consistent behavior across the application.

use chrono::Local;
use std::path::PathBuf;

/// Gets the application data directory using XDG Base Directory specification.
///
/// Returns `~/.local/share/stridewell/` on Unix-like systems. `$XDG_DATA_HOME`
/// takes priority so tests and sandboxed installs can relocate it.
///
/// # Example
///
/// ```rust,no_run
/// use stridewell::common::get_data_dir;
///
/// let data_dir = get_data_dir();
/// let slots_file = data_dir.join("session-slots.json");
/// ```
pub fn get_data_dir() -> PathBuf {
    let base_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| {
            // Fallback if dirs crate fails
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".local").join("share")
        });

    base_dir.join("stridewell")
}

/// Gets the current timestamp in ISO 8601 format.
///
/// # Example
///
/// ```rust
/// use stridewell::common::current_timestamp;
///
/// let timestamp = current_timestamp();
/// assert!(timestamp.contains("T")); // ISO 8601 format
/// ```
pub fn current_timestamp() -> String {
    Local::now().to_rfc3339()
}

/// Gets the current date in YYYY-MM-DD format (device-local).
///
/// # Example
///
/// ```rust
/// use stridewell::common::current_date;
///
/// let date = current_date();
/// assert_eq!(date.len(), 10); // YYYY-MM-DD
/// ```
pub fn current_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Formats a number of seconds as `h:mm:ss` (or `m:ss` under an hour).
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.to_string_lossy().contains("stridewell"));
    }

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        assert!(ts.contains("T"));
        assert!(ts.contains(":"));
    }

    #[test]
    fn test_current_date() {
        let date = current_date();
        assert_eq!(date.len(), 10);
        assert!(date.contains("-"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(61), "1:01");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3725), "1:02:05");
    }
}
