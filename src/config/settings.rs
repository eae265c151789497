//! Application settings and Telegram configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::DEFAULT_AUTO_DELETE_SECS;

/// Telegram API configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by `@BotFather`.
    pub bot_token: String,

    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("bot.session")
}

impl TelegramConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN`, `TG_API_ID` and `TG_API_HASH` to be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Creates configuration from `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = required_var(&lookup, "BOT_TOKEN")?;

        let api_id: i32 = required_var(&lookup, "TG_API_ID")?
            .trim()
            .parse()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(ConfigError::InvalidApiId)?;

        let api_hash = required_var(&lookup, "TG_API_HASH")?;

        let session_path =
            lookup("TG_SESSION_PATH").map_or_else(default_session_path, PathBuf::from);

        Ok(Self {
            bot_token,
            api_id,
            api_hash,
            session_path,
        })
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("session_path", &self.session_path)
            .finish()
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// User ids allowed to run admin commands.
    #[serde(default)]
    pub admin_ids: Vec<i64>,

    /// Seconds before a sent link message is deleted.
    #[serde(default = "default_auto_delete_delay")]
    pub auto_delete_delay_secs: u64,

    /// Path to the links JSON file.
    #[serde(default = "default_links_path")]
    pub links_path: PathBuf,

    /// Minimum interval between outbound messages in milliseconds.
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,

    /// How many times the update loop is restarted before giving up.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

fn default_auto_delete_delay() -> u64 {
    DEFAULT_AUTO_DELETE_SECS
}

fn default_links_path() -> PathBuf {
    PathBuf::from("links.json")
}

fn default_send_interval() -> u64 {
    50
}

fn default_max_restarts() -> u32 {
    5
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            auto_delete_delay_secs: default_auto_delete_delay(),
            links_path: default_links_path(),
            send_interval_ms: default_send_interval(),
            max_restarts: default_max_restarts(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables, falling back to
    /// defaults for unset variables.
    ///
    /// Set-but-malformed values are rejected rather than silently replaced.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Creates bot settings from `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_ids = match lookup("ADMIN_ID") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            admin_ids,
            auto_delete_delay_secs: parse_var(&lookup, "AUTO_DELETE_DELAY")?
                .unwrap_or_else(default_auto_delete_delay),
            links_path: lookup("LINKS_PATH").map_or_else(default_links_path, PathBuf::from),
            send_interval_ms: parse_var(&lookup, "SEND_INTERVAL_MS")?
                .unwrap_or_else(default_send_interval),
            max_restarts: parse_var(&lookup, "MAX_RESTARTS")?
                .unwrap_or_else(default_max_restarts),
        })
    }

    /// Returns the auto-delete delay as a [`Duration`].
    #[must_use]
    pub const fn auto_delete_delay(&self) -> Duration {
        Duration::from_secs(self.auto_delete_delay_secs)
    }

    /// Returns the send throttle interval as a [`Duration`].
    #[must_use]
    pub const fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    /// Checks whether the user may run admin commands.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id != 0 && self.admin_ids.contains(&user_id)
    }
}

/// Parses a comma separated list of admin user ids. Zero entries are skipped.
fn parse_admin_ids(raw: &str) -> Result<Vec<i64>, ConfigError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id: i64 = part.parse().map_err(|_| ConfigError::InvalidValue {
            name: "ADMIN_ID",
            value: part.to_owned(),
        })?;
        if id != 0 && !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn required_var(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnvVar(name))
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
