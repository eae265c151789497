//! Configuration module for the link bot.
//!
//! Handles loading and validation of the community links and of the
//! environment-driven settings (Telegram credentials, admins, timing).

mod links;
mod settings;

pub use links::{LinkConfig, LinkEntry, LinkError};
pub use settings::{BotSettings, ConfigError, TelegramConfig};

/// Prefix of the callback data attached to link buttons.
pub const LINK_CALLBACK_PREFIX: &str = "link_";

/// Maximum size of inline button callback data accepted by Telegram.
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

/// Default delay before a sent link is deleted.
pub const DEFAULT_AUTO_DELETE_SECS: u64 = 15;
