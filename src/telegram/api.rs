//! Transport-agnostic chat API used by the dispatcher and the deletion
//! scheduler.
//!
//! [`ChatApi`] is implemented by [`super::TelegramBot`] on top of grammers,
//! and by in-memory mocks in tests.

use std::fmt;

use async_trait::async_trait;

use super::TelegramError;

/// Identifier of a chat (Bot API dialog id).
pub type ChatId = i64;

/// Identifier of a message inside a chat.
pub type MessageId = i32;

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text shown on the button.
    pub text: String,

    /// Callback data sent back when the button is pressed.
    pub data: String,
}

impl Button {
    /// Creates a callback button.
    #[must_use]
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard attached below a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    /// Button rows, top to bottom.
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Total number of buttons.
    #[must_use]
    pub fn button_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// A message about to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// HTML formatted text.
    pub html: String,

    /// Optional inline keyboard.
    pub keyboard: Option<Keyboard>,

    /// Whether the message will be deleted later. Transports only keep
    /// handles to deletable messages.
    pub deletable: bool,
}

impl OutgoingMessage {
    /// Creates a plain HTML message.
    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            html: text.into(),
            keyboard: None,
            deletable: false,
        }
    }

    /// Attaches an inline keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Marks the message as one that will be deleted later.
    #[must_use]
    pub const fn deletable(mut self) -> Self {
        self.deletable = true;
        self
    }
}

/// A message that was delivered to a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentMessage {
    /// Chat the message was sent to.
    pub chat_id: ChatId,

    /// Id assigned by Telegram.
    pub message_id: MessageId,
}

impl fmt::Display for SentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.message_id)
    }
}

/// An event received from Telegram that the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming<Q> {
    /// A text message from a user.
    Message {
        chat_id: ChatId,
        sender_id: Option<i64>,
        sender_name: Option<String>,
        text: String,
    },

    /// An inline keyboard button press.
    Callback {
        query: Q,
        chat_id: ChatId,
        sender_id: Option<i64>,
        data: String,
    },
}

/// A command the bot advertises in the Telegram command menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command name without the leading slash.
    pub name: &'static str,

    /// Short description shown by Telegram clients.
    pub description: &'static str,
}

/// Outbound operations the bot performs against the messaging platform.
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    /// Platform handle of a pending callback query.
    type Callback: Send + Sync + 'static;

    /// Sends a message to the chat and returns where it landed.
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: OutgoingMessage,
    ) -> Result<SentMessage, TelegramError>;

    /// Deletes a message previously sent by the bot.
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
    -> Result<(), TelegramError>;

    /// Answers a callback query with a short notification.
    async fn answer_callback(&self, query: &Self::Callback, text: &str)
    -> Result<(), TelegramError>;

    /// Publishes the command menu shown by Telegram clients.
    async fn set_commands(&self, commands: &[CommandInfo]) -> Result<(), TelegramError>;
}

/// Source of incoming events, such as the Telegram update stream.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Platform handle of a pending callback query.
    type Callback: Send + Sync + 'static;

    /// Waits for the next event. An error means the stream needs a restart.
    async fn next_event(&self) -> Result<Incoming<Self::Callback>, TelegramError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_message_builder() {
        let keyboard = Keyboard {
            rows: vec![vec![Button::new("A", "a"), Button::new("B", "b")], vec![Button::new("C", "c")]],
        };
        let msg = OutgoingMessage::html("<b>hi</b>").with_keyboard(keyboard).deletable();
        assert!(msg.deletable);
        assert_eq!(msg.keyboard.map(|k| k.button_count()), Some(3));
    }

    #[test]
    fn test_sent_message_display() {
        let sent = SentMessage {
            chat_id: -100,
            message_id: 7,
        };
        assert_eq!(sent.to_string(), "-100/7");
    }
}
