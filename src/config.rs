use crate::error::{Result, TrackerError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the tracking core
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    /// Session tracking configuration
    pub tracking: TrackingConfig,

    /// Daily rollover configuration
    pub rollover: RolloverConfig,

    /// Background wake-task configuration
    pub background: BackgroundConfig,

    /// Snapshot store configuration
    pub store: StoreConfig,

    /// Retry configuration
    pub retry: RetryConfig,
}

/// Session tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// UI refresh tick interval in milliseconds (display only, never a time
    /// source)
    pub tick_interval_ms: u64,

    /// Minimum seconds between periodic snapshot writes
    pub snapshot_interval_secs: u64,

    /// Daily step goal shown as progress in the widget
    pub daily_step_goal: u64,
}

/// Daily rollover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloverConfig {
    /// Day-change poll interval in seconds
    pub poll_interval_secs: u64,
}

/// Background wake-task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// OS task identifier for the periodic wake task
    pub task_id: String,

    /// Minimum wake interval in seconds (the OS may coarsen this further)
    pub minimum_interval_secs: u64,
}

/// Snapshot store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Slot file name (relative to the data directory)
    pub slots_file: String,
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RetryConfig {
    /// Slot-file operation retry configuration
    pub file_ops: RetrySettings,
}

/// Individual retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Backoff factor (multiplier for each retry)
    pub backoff_factor: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            tick_interval_ms: 1000,
            snapshot_interval_secs: 30,
            daily_step_goal: 10_000,
        }
    }
}

impl Default for RolloverConfig {
    fn default() -> Self {
        RolloverConfig {
            poll_interval_secs: crate::rollover::DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        BackgroundConfig {
            task_id: "com.stridewell.tracker.refresh".to_string(),
            minimum_interval_secs: 900,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            slots_file: "session-slots.json".to_string(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

// Configuration loading
impl TrackerConfig {
    /// Load configuration from file, or use defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::find_config_file() {
            Self::load_from_file(&config_path)
        } else {
            Ok(TrackerConfig::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| TrackerError::config(format!("Failed to read config file: {}", e)))?;

        let config: TrackerConfig = toml::from_str(&contents)
            .map_err(|e| TrackerError::config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| TrackerError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TrackerError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, toml_string)
            .map_err(|e| TrackerError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Find config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check in order of priority:
        // 1. Environment variable from CLI flag
        if let Ok(path) = env::var("STRIDEWELL_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Environment variable
        if let Ok(path) = env::var("STRIDEWELL_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 3. XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("stridewell").join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 4. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            let path = home_dir.join(".stridewell.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Get default config file path (for creating new config)
    pub fn default_config_path() -> Result<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("stridewell").join("config.toml"))
        } else {
            Err(TrackerError::config(
                "Could not determine config directory",
            ))
        }
    }

    /// Generate example config file content
    pub fn example_toml() -> &'static str {
        r#"# Stridewell Tracker Configuration File
#
# This file configures the activity-tracking session core.
# All values shown are the defaults - you can override only what you need.

[tracking]
# UI refresh tick interval in milliseconds. Display only: the tick never
# accumulates time.
tick_interval_ms = 1000

# Minimum seconds between periodic snapshot writes while tracking
snapshot_interval_secs = 30

# Daily step goal shown as progress in the widget
daily_step_goal = 10000

[rollover]
# How often the calendar day is polled for rollover, in seconds
poll_interval_secs = 60

[background]
# OS task identifier for the periodic background wake task
task_id = "com.stridewell.tracker.refresh"

# Minimum wake interval in seconds (the OS may coarsen this further)
minimum_interval_secs = 900

[store]
# Slot file name, relative to the data directory
slots_file = "session-slots.json"

[retry.file_ops]
# Slot-file operation retry settings
max_attempts = 3
initial_delay_ms = 100
max_delay_ms = 5000
backoff_factor = 2.0
"#
    }
}

// Global configuration instance
use std::sync::OnceLock;

static CONFIG: OnceLock<TrackerConfig> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static TrackerConfig {
    CONFIG.get_or_init(|| {
        let mut config = TrackerConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            TrackerConfig::default()
        });

        // Override daily goal from environment if set
        if let Ok(goal) = env::var("STRIDEWELL_DAILY_STEP_GOAL") {
            match goal.parse() {
                Ok(parsed) => config.tracking.daily_step_goal = parsed,
                Err(_) => warn!("Ignoring unparseable STRIDEWELL_DAILY_STEP_GOAL={}", goal),
            }
        }

        config
    })
}
