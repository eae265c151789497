//! Command handler implementation.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::keyboard::links_keyboard;
use super::stats::{CommandCounter, UsageStats, format_uptime};
use super::types::{BotCommand, CallbackAction, CommandResult};
use crate::config::{BotSettings, LinkConfig, LinkEntry};
use crate::telegram::OutgoingMessage;

/// Chat message sent when a reply could not be delivered.
pub const GENERIC_FAILURE: &str = "❌ An error occurred. Please try again later.";

/// Callback notification sent when a reply could not be delivered.
pub const CALLBACK_FAILURE: &str = "❌ An error occurred!";

/// Who sent a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    /// Telegram user id, if known.
    pub user_id: Option<i64>,

    /// Display name, if known.
    pub first_name: Option<String>,
}

/// Turns commands and button presses into replies.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// Configured links.
    links: Arc<LinkConfig>,

    /// Bot settings (admins, auto-delete delay).
    settings: Arc<BotSettings>,

    /// Shared usage counters.
    stats: Arc<UsageStats>,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub const fn new(
        links: Arc<LinkConfig>,
        settings: Arc<BotSettings>,
        stats: Arc<UsageStats>,
    ) -> Self {
        Self {
            links,
            settings,
            stats,
        }
    }

    /// Executes a parsed command.
    ///
    /// `pending_deletions` is reported by `/stats`.
    pub async fn handle_command(
        &self,
        command: BotCommand,
        requester: &Requester,
        pending_deletions: usize,
    ) -> CommandResult {
        let commands = self.stats.record_command(command.name()).await;
        debug!(
            "Handling command {} (invocation #{})",
            command,
            commands.get(command.name())
        );

        if command.is_admin_only() && !self.is_admin(requester) {
            warn!("Denied {} for user {:?}", command, requester.user_id);
            return CommandResult::error(OutgoingMessage::html("❌ Access denied. Admin only."));
        }

        match command {
            BotCommand::Start => self.handle_start(requester),
            BotCommand::Help => CommandResult::success(self.help_message()),
            BotCommand::Stats => self.handle_stats(&commands, pending_deletions).await,
        }
    }

    fn is_admin(&self, requester: &Requester) -> bool {
        requester
            .user_id
            .is_some_and(|id| self.settings.is_admin(id))
    }

    /// Executes a button press.
    pub async fn handle_callback(&self, data: &str) -> CommandResult {
        match CallbackAction::parse(data) {
            CallbackAction::Help => {
                CommandResult::success(self.help_message()).with_notice("Help information sent!")
            }
            CallbackAction::Link(label) => match self.links.find(&label) {
                Some(link) => {
                    let requests = self.stats.record_link(&link.label).await;
                    debug!("Link {} requested {} time(s)", link.label, requests);

                    CommandResult::ephemeral(
                        self.link_message(link),
                        self.settings.auto_delete_delay(),
                    )
                    .with_notice(format!("✅ {} sent! Check your chat.", link.label))
                }
                None => {
                    debug!("Unknown link requested: {}", label);
                    CommandResult::rejected("❌ Link not found!")
                }
            },
            CallbackAction::Unknown(data) => {
                debug!("Unknown callback data: {}", data);
                CommandResult::rejected("❌ Unknown command!")
            }
        }
    }

    fn handle_start(&self, requester: &Requester) -> CommandResult {
        let name = requester
            .first_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("there");

        let text = format!(
            "👋 Welcome <b>{}</b>!\n\nChoose a link below to join the community:",
            escape_html(name)
        );

        if let Some(user_id) = requester.user_id {
            info!("User {} started the bot", user_id);
        }

        CommandResult::success(OutgoingMessage::html(text).with_keyboard(links_keyboard(&self.links)))
    }

    async fn handle_stats(
        &self,
        commands: &CommandCounter,
        pending_deletions: usize,
    ) -> CommandResult {
        let links = self.stats.links().await;

        let mut text = format!(
            "📊 <b>Bot Statistics</b>\n\n\
             • Total links: {}\n\
             • Uptime: {}\n\
             • Auto-delete delay: {} seconds\n\
             • Pending deletions: {}\n\n\
             <b>Command usage:</b>",
            self.links.len(),
            format_uptime(self.stats.uptime()),
            self.settings.auto_delete_delay_secs,
            pending_deletions,
        );

        for command in BotCommand::ALL {
            let _ = write!(text, "\n• {}: {}", command, commands.get(command.name()));
        }

        text.push_str("\n\n<b>Available links:</b>");
        for label in self.links.labels() {
            let _ = write!(
                text,
                "\n• {} ({} requests)",
                escape_html(label),
                links.get(label)
            );
        }

        CommandResult::success(OutgoingMessage::html(text))
    }

    /// Help text, including the configured auto-delete delay.
    #[must_use]
    pub fn help_message(&self) -> OutgoingMessage {
        let mut text = String::from("🤖 <b>Bot Help</b>\n\n<b>Commands:</b>");
        for command in BotCommand::ALL {
            let _ = write!(text, "\n• {} - {}", command, command.description());
        }

        let _ = write!(
            text,
            "\n\n<b>How to use:</b>\n\
             1. Click on any link button to receive the invite link\n\
             2. Links are automatically deleted after {} seconds for privacy\n\
             3. Join the community and enjoy!\n\n\
             <b>Need support?</b>\n\
             Contact the administrator if you encounter any issues.",
            self.settings.auto_delete_delay_secs
        );

        OutgoingMessage::html(text)
    }

    /// Message carrying a single link.
    #[must_use]
    pub fn link_message(&self, link: &LinkEntry) -> OutgoingMessage {
        OutgoingMessage::html(format!(
            "🔗 <b>{}</b>\n\n👉 {}\n\n⏰ This message will be deleted in {} seconds",
            escape_html(&link.label),
            escape_html(&link.url),
            self.settings.auto_delete_delay_secs
        ))
    }
}

/// Escapes text for Telegram's HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(admin: i64, delay: u64) -> CommandHandler {
        let links = LinkConfig::new(vec![
            LinkEntry::new("Community", "https://example.com/chat"),
            LinkEntry::new("Watch", "https://t.me/bot?startapp=a&b=c"),
        ]);
        let settings = BotSettings {
            admin_ids: vec![admin],
            auto_delete_delay_secs: delay,
            ..BotSettings::default()
        };
        CommandHandler::new(Arc::new(links), Arc::new(settings), Arc::new(UsageStats::new()))
    }

    fn admin() -> Requester {
        Requester {
            user_id: Some(1),
            first_name: Some("Ann".to_owned()),
        }
    }

    fn reply_text(result: &CommandResult) -> &str {
        result.reply.as_ref().map_or("", |r| r.html.as_str())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[tokio::test]
    async fn test_start_escapes_name_and_attaches_keyboard() {
        let handler = handler(1, 15);
        let requester = Requester {
            user_id: Some(5),
            first_name: Some("<Bob>".to_owned()),
        };
        let result = handler.handle_command(BotCommand::Start, &requester, 0).await;

        assert!(result.success);
        assert!(reply_text(&result).contains("Welcome <b>&lt;Bob&gt;</b>!"));
        let keyboard = result.reply.and_then(|r| r.keyboard).unwrap();
        assert_eq!(keyboard.button_count(), 3);
    }

    #[tokio::test]
    async fn test_start_without_name() {
        let result = handler(1, 15)
            .handle_command(BotCommand::Start, &Requester::default(), 0)
            .await;
        assert!(reply_text(&result).contains("Welcome <b>there</b>!"));
    }

    #[tokio::test]
    async fn test_help_mentions_configured_delay() {
        let result = handler(1, 30)
            .handle_command(BotCommand::Help, &admin(), 0)
            .await;
        assert!(reply_text(&result).contains("deleted after 30 seconds"));
        assert!(reply_text(&result).contains("/stats - Show bot statistics (admin only)"));
    }

    #[tokio::test]
    async fn test_stats_denied_for_non_admin() {
        let handler = handler(1, 15);
        let stranger = Requester {
            user_id: Some(2),
            first_name: None,
        };
        let result = handler.handle_command(BotCommand::Stats, &stranger, 0).await;

        assert!(!result.success);
        assert_eq!(reply_text(&result), "❌ Access denied. Admin only.");

        let result = handler.handle_command(BotCommand::Stats, &admin(), 0).await;
        assert!(reply_text(&result).contains("• /stats: 2"));
    }

    #[tokio::test]
    async fn test_stats_denied_without_sender() {
        let result = handler(1, 15)
            .handle_command(BotCommand::Stats, &Requester::default(), 0)
            .await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_stats_counts_increment() {
        let handler = handler(1, 15);
        for expected in 1..=3 {
            let result = handler.handle_command(BotCommand::Stats, &admin(), 0).await;
            assert!(result.success);
            assert!(reply_text(&result).contains(&format!("• /stats: {expected}")));
        }
    }

    #[tokio::test]
    async fn test_stats_reports_links_and_pending() {
        let handler = handler(1, 15);
        handler.handle_command(BotCommand::Start, &admin(), 0).await;
        handler.handle_callback("link_Community").await;
        handler.handle_callback("link_Community").await;

        let result = handler.handle_command(BotCommand::Stats, &admin(), 2).await;
        let text = reply_text(&result);
        assert!(text.contains("• Total links: 2"));
        assert!(text.contains("• Pending deletions: 2"));
        assert!(text.contains("• /start: 1"));
        assert!(text.contains("• /help: 0"));
        assert!(text.contains("• Community (2 requests)"));
        assert!(text.contains("• Watch (0 requests)"));
    }

    #[tokio::test]
    async fn test_link_callback() {
        let result = handler(1, 30).handle_callback("link_Community").await;

        assert!(result.success);
        assert_eq!(result.auto_delete, Some(std::time::Duration::from_secs(30)));
        assert_eq!(result.notice.as_deref(), Some("✅ Community sent! Check your chat."));
        let reply = result.reply.unwrap();
        assert!(reply.deletable);
        assert_eq!(
            reply.html,
            "🔗 <b>Community</b>\n\n👉 https://example.com/chat\n\n⏰ This message will be deleted in 30 seconds"
        );
    }

    #[tokio::test]
    async fn test_link_callback_escapes_url() {
        let result = handler(1, 15).handle_callback("link_Watch").await;
        assert!(reply_text(&result).contains("https://t.me/bot?startapp=a&amp;b=c"));
    }

    #[tokio::test]
    async fn test_unknown_link_and_data() {
        let handler = handler(1, 15);

        let missing = handler.handle_callback("link_Nope").await;
        assert!(!missing.success);
        assert!(missing.reply.is_none());
        assert_eq!(missing.notice.as_deref(), Some("❌ Link not found!"));

        let unknown = handler.handle_callback("garbage").await;
        assert_eq!(unknown.notice.as_deref(), Some("❌ Unknown command!"));
    }

    #[tokio::test]
    async fn test_help_callback() {
        let result = handler(1, 15).handle_callback("help").await;
        assert!(result.success);
        assert!(result.auto_delete.is_none());
        assert_eq!(result.notice.as_deref(), Some("Help information sent!"));
    }
}
