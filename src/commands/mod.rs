//! Command handling module.
//!
//! Parses `/start`, `/help` and `/stats` commands and link keyboard
//! callbacks, and builds the replies for them.

mod handler;
mod keyboard;
mod stats;
mod types;

pub use handler::{CALLBACK_FAILURE, CommandHandler, GENERIC_FAILURE, Requester, escape_html};
pub use keyboard::{BUTTONS_PER_ROW, HELP_BUTTON_TEXT, links_keyboard};
pub use stats::{CommandCounter, UsageStats, format_uptime};
pub use types::{BotCommand, CallbackAction, CommandResult, HELP_CALLBACK};
