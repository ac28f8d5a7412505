use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::IntouchError;

/// Longest reminder interval a contact may have (100 years).
pub const MAX_INTERVAL_DAYS: i64 = 36_500;
/// Longest gap between two notifications for one contact (10 years).
pub const MAX_REPEAT_INTERVAL_HOURS: i64 = 87_600;
/// Longest daemon cadence (one year).
pub const MAX_TICK_INTERVAL_HOURS: u64 = 8_760;

/// Top-level InTouch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub intouch: IntouchConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntouchConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for IntouchConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Reminder timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Interval given to contacts without a persisted one.
    #[serde(default = "default_interval_days")]
    pub default_interval_days: i64,
    /// Minimum time between two notifications for the same contact.
    #[serde(default = "default_repeat_interval_hours")]
    pub repeat_interval_hours: i64,
    /// Cadence of the background check when running as a daemon.
    #[serde(default = "default_tick_interval_hours")]
    pub tick_interval_hours: u64,
    /// Upper bound accepted when the user sets an interval.
    #[serde(default = "default_max_interval_days")]
    pub max_interval_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            default_interval_days: default_interval_days(),
            repeat_interval_hours: default_repeat_interval_hours(),
            tick_interval_hours: default_tick_interval_hours(),
            max_interval_days: default_max_interval_days(),
        }
    }
}

/// Notification text and delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Title prefix; the contact name is appended.
    #[serde(default = "default_notify_title")]
    pub title: String,
    #[serde(default = "default_notify_body")]
    pub body: String,
    /// Group key shared by individual notifications and their summary.
    #[serde(default = "default_group_id")]
    pub group_id: String,
    /// External notifier invoked as `<command> <title> <body>`. Empty = log only.
    #[serde(default)]
    pub command: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            title: default_notify_title(),
            body: default_notify_body(),
            group_id: default_group_id(),
            command: String::new(),
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding the address book, message history and notification log.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// JSON preference blob.
    #[serde(default = "default_prefs_path")]
    pub prefs_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            prefs_path: default_prefs_path(),
        }
    }
}

impl Config {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), IntouchError> {
        let r = &self.reminder;
        if r.default_interval_days <= 0 {
            return Err(IntouchError::Config(format!(
                "reminder.default_interval_days must be positive, got {}",
                r.default_interval_days
            )));
        }
        if r.max_interval_days < r.default_interval_days {
            return Err(IntouchError::Config(format!(
                "reminder.max_interval_days ({}) is below default_interval_days ({})",
                r.max_interval_days, r.default_interval_days
            )));
        }
        if r.repeat_interval_hours < 0 {
            return Err(IntouchError::Config(format!(
                "reminder.repeat_interval_hours must not be negative, got {}",
                r.repeat_interval_hours
            )));
        }
        if r.tick_interval_hours == 0 {
            return Err(IntouchError::Config(
                "reminder.tick_interval_hours must be positive".to_string(),
            ));
        }

        if r.max_interval_days > MAX_INTERVAL_DAYS {
            return Err(IntouchError::Config(format!(
                "reminder.max_interval_days must be at most {MAX_INTERVAL_DAYS}, got {}",
                r.max_interval_days
            )));
        }
        if r.repeat_interval_hours > MAX_REPEAT_INTERVAL_HOURS {
            return Err(IntouchError::Config(format!(
                "reminder.repeat_interval_hours must be at most {MAX_REPEAT_INTERVAL_HOURS}, got {}",
                r.repeat_interval_hours
            )));
        }
        if r.tick_interval_hours > MAX_TICK_INTERVAL_HOURS {
            return Err(IntouchError::Config(format!(
                "reminder.tick_interval_hours must be at most {MAX_TICK_INTERVAL_HOURS}, got {}",
                r.tick_interval_hours
            )));
        }
        Ok(())
    }
}

// --- Default value functions ---

fn default_data_dir() -> String {
    "~/.intouch".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_interval_days() -> i64 {
    crate::contact::DEFAULT_INTERVAL_DAYS
}
fn default_repeat_interval_hours() -> i64 {
    24
}
fn default_tick_interval_hours() -> u64 {
    4
}
fn default_max_interval_days() -> i64 {
    365
}
fn default_notify_title() -> String {
    "Reach out to".to_string()
}
fn default_notify_body() -> String {
    "It's been a while. Send them a message?".to_string()
}
fn default_group_id() -> String {
    "intouch".to_string()
}
fn default_db_path() -> String {
    "~/.intouch/intouch.db".to_string()
}
fn default_prefs_path() -> String {
    "~/.intouch/contacts.json".to_string()
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load and validate configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, IntouchError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| IntouchError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| IntouchError::Config(format!("failed to parse config: {}", e)))?;

    config.validate()?;
    Ok(config)
}
