//! Telegram client wrapper for the link bot.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::message::{InputMessage, Message};
use grammers_client::update::{CallbackQuery, Update};
use grammers_client::{
    Client, InvocationError, SenderPool, UpdatesConfiguration, button, reply_markup, sender,
};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::RateLimiter;
use super::recent::RecentMap;
use super::api::{
    ChatApi, ChatId, CommandInfo, EventSource, Incoming, Keyboard, MessageId, OutgoingMessage, SentMessage,
};
use crate::commands::CALLBACK_FAILURE;
use crate::config::TelegramConfig;

/// Capacity of the channel between the update pump and the dispatcher.
const UPDATE_QUEUE_CAPACITY: usize = 256;

/// Chats the bot can reply to at once; the least recently active is dropped.
const MAX_REPLY_ANCHORS: usize = 10_000;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Bot sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("No conversation known for chat {0}")]
    UnknownChat(ChatId),

    #[error("Message {message_id} in chat {chat_id} is not tracked for deletion")]
    UnknownMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },

    #[error("Update stream closed")]
    UpdatesClosed,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl TelegramError {
    /// Whether the update stream itself is broken, as opposed to a single
    /// request failing. Only stream failures warrant restarting the loop.
    #[must_use]
    pub const fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            Self::UpdatesClosed | Self::Connection(_) | Self::Session(_) | Self::SignInFailed(_)
        )
    }
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];
    let lowered = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Telegram bot connected over `MTProto`.
///
/// Replies are sent through the latest message seen in each chat, so the
/// bot can only write to chats that wrote to it first.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Throttle for outbound messages.
    rate_limiter: RateLimiter,

    /// Updates forwarded by the pump task.
    updates: Mutex<mpsc::Receiver<Result<Update, TelegramError>>>,

    /// Latest incoming message per recently active chat, used as the reply
    /// anchor.
    anchors: RwLock<RecentMap<ChatId, Message>>,

    /// Sent messages that are waiting to be deleted.
    deletable: Mutex<HashMap<(ChatId, MessageId), Message>>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,

    /// Background task pumping the update stream.
    _pump_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram and signs in with the bot token if needed.
    pub async fn connect(
        config: &TelegramConfig,
        rate_limiter: RateLimiter,
    ) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        if is_authorized {
            info!("Reusing authorized bot session");
        } else {
            info!("Signing in with bot token...");
            client
                .bot_sign_in(&config.bot_token, &config.api_hash)
                .await
                .map_err(|e| TelegramError::SignInFailed(e.to_string()))?;
            info!("Signed in as bot");
        }

        let mut stream = client
            .stream_updates(
                updates,
                UpdatesConfiguration {
                    catch_up: false,
                    ..Default::default()
                },
            )
            .await;

        let (tx, rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
        let pump_task = tokio::spawn(async move {
            loop {
                let item = stream
                    .next()
                    .await
                    .map_err(|e| TelegramError::Connection(e.to_string()));
                if tx.send(item).await.is_err() {
                    break;
                }
            }
            stream.sync_update_state().await;
        });

        Ok(Self {
            client,
            handle: handle.thin,
            rate_limiter,
            updates: Mutex::new(rx),
            anchors: RwLock::new(RecentMap::new(MAX_REPLY_ANCHORS)),
            deletable: Mutex::new(HashMap::new()),
            _pool_task: pool_task,
            _pump_task: pump_task,
        })
    }

    async fn convert(
        &self,
        update: Update,
    ) -> Result<Option<Incoming<CallbackQuery>>, TelegramError> {
        match update {
            Update::NewMessage(message) if !message.outgoing() => {
                let text = message.text().to_owned();
                if text.is_empty() {
                    return Ok(None);
                }

                let chat_id = chat_id_of(&message);
                let (sender_id, sender_name) = sender_of(&message);
                self.remember_anchor(chat_id, message.clone()).await;

                Ok(Some(Incoming::Message {
                    chat_id,
                    sender_id,
                    sender_name,
                    text,
                }))
            }
            Update::CallbackQuery(query) => {
                let data = String::from_utf8_lossy(query.data()).into_owned();
                let message = match query.load_message().await {
                    Ok(message) => message,
                    Err(e) => {
                        if let Err(e) = query.answer().text(CALLBACK_FAILURE).send().await {
                            warn!("Failed to answer callback query: {}", e);
                        }
                        return Err(e.into());
                    }
                };
                let chat_id = chat_id_of(&message);
                let sender_id = query.sender().map(|peer| peer.id().bot_api_dialog_id());
                self.remember_anchor(chat_id, message).await;

                Ok(Some(Incoming::Callback {
                    query,
                    chat_id,
                    sender_id,
                    data,
                }))
            }
            _ => Ok(None),
        }
    }

    async fn remember_anchor(&self, chat_id: ChatId, message: Message) {
        if let Some(evicted) = self.anchors.write().await.insert(chat_id, message) {
            debug!("Forgot reply anchor of inactive chat {}", evicted);
        }
    }

    /// Number of chats the bot can currently reply to.
    pub async fn known_chats(&self) -> usize {
        self.anchors.read().await.len()
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }

    async fn throttled<T, F>(&self, op: F) -> Result<T, TelegramError>
    where
        F: Future<Output = Result<T, InvocationError>>,
    {
        let waited = self.rate_limiter.wait_and_acquire().await;
        if !waited.is_zero() {
            debug!("Waited {:?} for send slot", waited);
        }

        match op.await {
            Ok(value) => Ok(value),
            Err(e) => {
                let err: TelegramError = e.into();
                if let TelegramError::FloodWait(seconds) = &err {
                    self.rate_limiter.handle_flood_wait(*seconds).await;
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl EventSource for TelegramBot {
    type Callback = CallbackQuery;

    /// Waits for the next update the bot reacts to.
    ///
    /// Updates the bot ignores (edits, its own messages, service messages)
    /// are skipped.
    async fn next_event(&self) -> Result<Incoming<CallbackQuery>, TelegramError> {
        loop {
            let update = self
                .updates
                .lock()
                .await
                .recv()
                .await
                .ok_or(TelegramError::UpdatesClosed)??;

            match self.convert(update).await {
                Ok(Some(event)) => return Ok(event),
                Ok(None) => {}
                Err(e) => warn!("Skipping update that could not be handled: {}", e),
            }
        }
    }
}

#[async_trait]
impl ChatApi for TelegramBot {
    type Callback = CallbackQuery;

    async fn send_message(
        &self,
        chat_id: ChatId,
        message: OutgoingMessage,
    ) -> Result<SentMessage, TelegramError> {
        let anchor = self
            .anchors
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .ok_or(TelegramError::UnknownChat(chat_id))?;

        let deletable = message.deletable;
        let sent = self.throttled(anchor.respond(to_input_message(message))).await?;
        let message_id = sent.id();

        if deletable {
            self.deletable.lock().await.insert((chat_id, message_id), sent);
        }

        debug!("Sent message {} to chat {}", message_id, chat_id);
        Ok(SentMessage {
            chat_id,
            message_id,
        })
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TelegramError> {
        let message = self
            .deletable
            .lock()
            .await
            .remove(&(chat_id, message_id))
            .ok_or(TelegramError::UnknownMessage {
                chat_id,
                message_id,
            })?;

        message.delete().await.map_err(TelegramError::from)
    }

    async fn answer_callback(
        &self,
        query: &CallbackQuery,
        text: &str,
    ) -> Result<(), TelegramError> {
        query
            .answer()
            .text(text)
            .send()
            .await
            .map_err(TelegramError::from)
    }

    async fn set_commands(&self, commands: &[CommandInfo]) -> Result<(), TelegramError> {
        let request = tl::functions::bots::SetBotCommands {
            scope: tl::enums::BotCommandScope::Default,
            lang_code: String::new(),
            commands: commands
                .iter()
                .map(|c| {
                    tl::enums::BotCommand::Command(tl::types::BotCommand {
                        command: c.name.to_owned(),
                        description: c.description.to_owned(),
                    })
                })
                .collect(),
        };

        match self.client.invoke(&request).await {
            Ok(_) => {
                info!("Published {} bot commands", commands.len());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to publish bot commands: {}", e);
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

fn chat_id_of(message: &Message) -> ChatId {
    message.peer_id().bot_api_dialog_id()
}

fn sender_of(message: &Message) -> (Option<i64>, Option<String>) {
    message.sender().map_or((None, None), |peer| {
        (
            Some(peer.id().bot_api_dialog_id()),
            peer.name().map(str::to_owned),
        )
    })
}

fn to_input_message(message: OutgoingMessage) -> InputMessage {
    let input = InputMessage::new().html(message.html);
    match message.keyboard {
        Some(keyboard) if keyboard.button_count() > 0 => {
            input.reply_markup(&reply_markup::inline(to_inline_rows(&keyboard)))
        }
        _ => input,
    }
}

fn to_inline_rows(keyboard: &Keyboard) -> Vec<Vec<button::Inline>> {
    keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| button::inline(b.text.clone(), b.data.clone().into_bytes()))
                .collect()
        })
        .collect()
}
