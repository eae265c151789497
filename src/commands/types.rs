//! Command types and definitions.

use std::fmt;
use std::time::Duration;

use crate::config::LINK_CALLBACK_PREFIX;
use crate::telegram::{CommandInfo, OutgoingMessage};

/// Callback data of the help button.
pub const HELP_CALLBACK: &str = "help";

/// Available bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotCommand {
    /// Show the welcome message with the link keyboard.
    Start,

    /// Show help information.
    Help,

    /// Show usage statistics (admin only).
    Stats,
}

impl BotCommand {
    /// Every command, in menu order.
    pub const ALL: [Self; 3] = [Self::Start, Self::Help, Self::Stats];

    /// Parses a command from a message text.
    ///
    /// Accepts `/name`, `/name@BotName` and trailing arguments, which are
    /// ignored. Returns `None` if the message is not a known command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let after_slash = text.trim().strip_prefix('/')?;

        let word = after_slash
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default();
        let name = word.split_once('@').map_or(word, |(name, _bot)| name);

        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }

    /// Returns the command name as it appears in chat, without the slash.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Stats => "stats",
        }
    }

    /// Returns the command description for help and the command menu.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Start => "Show main menu",
            Self::Help => "Show this help message",
            Self::Stats => "Show bot statistics (admin only)",
        }
    }

    /// Whether only admins may run the command.
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        matches!(self, Self::Stats)
    }

    /// Returns the entries published as the Telegram command menu.
    #[must_use]
    pub fn menu() -> Vec<CommandInfo> {
        Self::ALL
            .iter()
            .map(|cmd| CommandInfo {
                name: cmd.name(),
                description: cmd.description(),
            })
            .collect()
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// Action requested by an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// The help button.
    Help,

    /// A link button carrying the link label.
    Link(String),

    /// Data the bot never produces.
    Unknown(String),
}

impl CallbackAction {
    /// Parses callback data produced by the link keyboard.
    #[must_use]
    pub fn parse(data: &str) -> Self {
        if data == HELP_CALLBACK {
            return Self::Help;
        }

        match data.strip_prefix(LINK_CALLBACK_PREFIX) {
            Some(label) => Self::Link(label.to_owned()),
            None => Self::Unknown(data.to_owned()),
        }
    }
}

/// Result of command or callback execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the request was served.
    pub success: bool,

    /// Message to post in the chat.
    pub reply: Option<OutgoingMessage>,

    /// Short notification for the callback query.
    pub notice: Option<String>,

    /// Delete the reply after this delay.
    pub auto_delete: Option<Duration>,
}

impl CommandResult {
    /// Creates a successful result that posts a message.
    #[must_use]
    pub fn success(reply: OutgoingMessage) -> Self {
        Self {
            success: true,
            reply: Some(reply),
            notice: None,
            auto_delete: None,
        }
    }

    /// Creates a successful result whose message is deleted after `delay`.
    #[must_use]
    pub fn ephemeral(reply: OutgoingMessage, delay: Duration) -> Self {
        Self {
            success: true,
            reply: Some(reply.deletable()),
            notice: None,
            auto_delete: Some(delay),
        }
    }

    /// Creates an error result that posts a message.
    #[must_use]
    pub fn error(reply: OutgoingMessage) -> Self {
        Self {
            success: false,
            reply: Some(reply),
            notice: None,
            auto_delete: None,
        }
    }

    /// Creates an error result that only answers the callback query.
    #[must_use]
    pub fn rejected(notice: impl Into<String>) -> Self {
        Self {
            success: false,
            reply: None,
            notice: Some(notice.into()),
            auto_delete: None,
        }
    }

    /// Adds the callback query notification.
    #[must_use]
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}
