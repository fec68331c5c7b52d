//! Runtime configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a default so the server starts with an empty environment.
//! Values that fail to parse fall back to the default; only combinations
//! that would break the matching rules (a minimum group size of zero, or a
//! minimum above the maximum) are rejected at start-up.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUBLIC_DIR: &str = "public";

pub const DEFAULT_MAX_GROUP_SIZE: usize = 6;
pub const DEFAULT_MIN_GROUP_SIZE: usize = 3;
pub const DEFAULT_MAX_TIME_TO_WAIT_FOR_REACHING_MAX_SIZE_MS: u64 = 180_000;
pub const DEFAULT_MAX_TIMEOUT_BEFORE_MARKING_AS_INACTIVE_MS: u64 = 11_000;
pub const DEFAULT_STALE_ENTRY_TTL_MS: u64 = 600_000;
pub const DEFAULT_CHAT_BASE_URL: &str = "https://talky.io";

pub const DEFAULT_MINIMUM_TIME_BETWEEN_NOTIFICATIONS_MS: u64 = 300_000;
pub const DEFAULT_NOTIFICATION_TTL_SECS: u64 = 3600;
pub const DEFAULT_VAPID_SUBJECT: &str = "https://watercoolerchat.online/";
pub const DEFAULT_SW_PUBLIC_KEY: &str =
    "BKHcfZBeFKoeKhkgC1L9qbnG-1zrMymK-AuMSlqvgLgLnbKHpVy5hHNFCcwIWnagUvoaXWgNnjoQJnIN6-i0i5E";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid group sizes: MIN_GROUP_SIZE={min} must be between 1 and MAX_GROUP_SIZE={max}")]
    InvalidGroupSizes { min: usize, max: usize },
}

// =============================================================================
// MATCHING
// =============================================================================

/// Tuning knobs for the matching state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// A group with this many members closes immediately.
    pub max_group_size: usize,
    /// Members required before the time-based close rule applies.
    pub min_group_size: usize,
    /// How long a group that reached the minimum waits for more arrivals.
    pub max_wait_for_full_group: Duration,
    /// Members silent for longer than this are purged from their group.
    pub inactivity_timeout: Duration,
    /// Entries silent for longer than this are dropped from the queue on the next `add`.
    pub stale_entry_ttl: Duration,
    /// Prefix for generated chat-room URLs, without a trailing slash.
    pub chat_base_url: String,
}

impl MatchConfig {
    /// Build matching config from environment variables.
    ///
    /// Optional:
    /// - `MAX_GROUP_SIZE`: default 6
    /// - `MIN_GROUP_SIZE`: default 3
    /// - `MAX_TIME_TO_WAIT_FOR_REACHING_MAX_SIZE_MS`: default 180000
    /// - `MAX_TIMEOUT_BEFORE_MARKING_AS_INACTIVE_MS`: default 11000
    /// - `STALE_ENTRY_TTL_MS`: default 600000
    /// - `CHAT_BASE_URL`: default `https://talky.io`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGroupSizes`] if the sizes are inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            max_group_size: env_parse("MAX_GROUP_SIZE", DEFAULT_MAX_GROUP_SIZE),
            min_group_size: env_parse("MIN_GROUP_SIZE", DEFAULT_MIN_GROUP_SIZE),
            max_wait_for_full_group: Duration::from_millis(env_parse(
                "MAX_TIME_TO_WAIT_FOR_REACHING_MAX_SIZE_MS",
                DEFAULT_MAX_TIME_TO_WAIT_FOR_REACHING_MAX_SIZE_MS,
            )),
            inactivity_timeout: Duration::from_millis(env_parse(
                "MAX_TIMEOUT_BEFORE_MARKING_AS_INACTIVE_MS",
                DEFAULT_MAX_TIMEOUT_BEFORE_MARKING_AS_INACTIVE_MS,
            )),
            stale_entry_ttl: Duration::from_millis(env_parse("STALE_ENTRY_TTL_MS", DEFAULT_STALE_ENTRY_TTL_MS)),
            chat_base_url: std::env::var("CHAT_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CHAT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the group sizes leave the closing rules satisfiable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGroupSizes`] when `min_group_size` is zero
    /// or larger than `max_group_size`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_group_size == 0 || self.min_group_size > self.max_group_size {
            return Err(ConfigError::InvalidGroupSizes { min: self.min_group_size, max: self.max_group_size });
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            max_wait_for_full_group: Duration::from_millis(DEFAULT_MAX_TIME_TO_WAIT_FOR_REACHING_MAX_SIZE_MS),
            inactivity_timeout: Duration::from_millis(DEFAULT_MAX_TIMEOUT_BEFORE_MARKING_AS_INACTIVE_MS),
            stale_entry_ttl: Duration::from_millis(DEFAULT_STALE_ENTRY_TTL_MS),
            chat_base_url: DEFAULT_CHAT_BASE_URL.to_string(),
        }
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// VAPID private key, URL-safe base64. Notifications are enabled only when this is set.
    pub private_key: Option<String>,
    /// Application server key handed to browsers when they subscribe.
    pub public_key: String,
    /// Minimum spacing between notification bursts for one company.
    pub cooldown: Duration,
    /// Push message time-to-live, sent as the `TTL` header.
    pub ttl_secs: u64,
    /// `sub` claim of the VAPID token: a contact URL or `mailto:` address.
    pub subject: String,
}

impl NotificationConfig {
    /// Build notification config from environment variables.
    ///
    /// - `SW_PRIVATE_KEY`: enables notifications when present
    /// - `SW_PUBLIC_KEY`: default built-in key
    /// - `MINIMUM_TIME_BETWEEN_NOTIFICATIONS_MS`: default 300000
    /// - `NOTIFICATION_TTL_SECS`: default 3600
    /// - `VAPID_SUBJECT`: default `https://watercoolerchat.online/`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            private_key: std::env::var("SW_PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty()),
            public_key: std::env::var("SW_PUBLIC_KEY").unwrap_or_else(|_| DEFAULT_SW_PUBLIC_KEY.to_string()),
            cooldown: Duration::from_millis(env_parse(
                "MINIMUM_TIME_BETWEEN_NOTIFICATIONS_MS",
                DEFAULT_MINIMUM_TIME_BETWEEN_NOTIFICATIONS_MS,
            )),
            ttl_secs: env_parse("NOTIFICATION_TTL_SECS", DEFAULT_NOTIFICATION_TTL_SECS),
            subject: std::env::var("VAPID_SUBJECT").unwrap_or_else(|_| DEFAULT_VAPID_SUBJECT.to_string()),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.private_key.is_some()
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            public_key: DEFAULT_SW_PUBLIC_KEY.to_string(),
            cooldown: Duration::from_millis(DEFAULT_MINIMUM_TIME_BETWEEN_NOTIFICATIONS_MS),
            ttl_secs: DEFAULT_NOTIFICATION_TTL_SECS,
            subject: DEFAULT_VAPID_SUBJECT.to_string(),
        }
    }
}

// =============================================================================
// APP
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub public_dir: PathBuf,
    pub matching: MatchConfig,
    pub notifications: NotificationConfig,
}

impl AppConfig {
    /// Load the full server configuration.
    ///
    /// # Errors
    ///
    /// Propagates [`MatchConfig::from_env`] validation failures.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            public_dir: std::env::var("PUBLIC_DIR")
                .map_or_else(|_| PathBuf::from(DEFAULT_PUBLIC_DIR), PathBuf::from),
            matching: MatchConfig::from_env()?,
            notifications: NotificationConfig::from_env(),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
