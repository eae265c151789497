//! Routes incoming events to the command handler and delivers the replies.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::commands::{
    BotCommand, CALLBACK_FAILURE, CommandHandler, CommandResult, GENERIC_FAILURE, Requester,
};
use crate::scheduler::DeletionScheduler;
use crate::telegram::{ChatApi, ChatId, Incoming, OutgoingMessage, SentMessage, TelegramError};

/// Handles one incoming event at a time; callers run many in parallel.
pub struct Dispatcher<A: ChatApi> {
    /// Transport for replies.
    api: Arc<A>,

    /// Builds the replies.
    handler: CommandHandler,

    /// Auto-deletes ephemeral replies.
    scheduler: DeletionScheduler<A>,
}

impl<A: ChatApi> Dispatcher<A> {
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new(
        api: Arc<A>,
        handler: CommandHandler,
        scheduler: DeletionScheduler<A>,
    ) -> Self {
        Self {
            api,
            handler,
            scheduler,
        }
    }

    /// The deletion scheduler used for ephemeral replies.
    #[must_use]
    pub const fn scheduler(&self) -> &DeletionScheduler<A> {
        &self.scheduler
    }

    /// The command handler.
    #[must_use]
    pub const fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    /// Handles a single event. Never fails; problems are logged.
    pub async fn dispatch(&self, event: Incoming<A::Callback>) {
        match event {
            Incoming::Message {
                chat_id,
                sender_id,
                sender_name,
                text,
            } => {
                let requester = Requester {
                    user_id: sender_id,
                    first_name: sender_name,
                };
                self.on_message(chat_id, &requester, &text).await;
            }
            Incoming::Callback {
                query,
                chat_id,
                sender_id,
                data,
            } => self.on_callback(&query, chat_id, sender_id, &data).await,
        }
    }

    async fn on_message(&self, chat_id: ChatId, requester: &Requester, text: &str) {
        let Some(command) = BotCommand::parse(text) else {
            debug!("Ignoring non-command message in chat {}", chat_id);
            return;
        };

        let pending = self.scheduler.pending_count().await;
        let result = self.handler.handle_command(command, requester, pending).await;

        if let Err(e) = self.deliver(chat_id, &result).await {
            error!("Failed to send {} reply to chat {}: {}", command, chat_id, e);
            if let Err(e) = self
                .api
                .send_message(chat_id, OutgoingMessage::html(GENERIC_FAILURE))
                .await
            {
                warn!("Failed to send failure notice to chat {}: {}", chat_id, e);
            }
        }
    }

    async fn on_callback(
        &self,
        query: &A::Callback,
        chat_id: ChatId,
        sender_id: Option<i64>,
        data: &str,
    ) {
        let result = self.handler.handle_callback(data).await;

        let notice = match self.deliver(chat_id, &result).await {
            Ok(_) => {
                if result.success && result.auto_delete.is_some() {
                    info!("User {:?} requested {} in chat {}", sender_id, data, chat_id);
                }
                result.notice
            }
            Err(e) => {
                error!("Failed to answer callback {:?} in chat {}: {}", data, chat_id, e);
                Some(CALLBACK_FAILURE.to_owned())
            }
        };

        if let Some(text) = notice
            && let Err(e) = self.api.answer_callback(query, &text).await
        {
            warn!("Failed to answer callback query: {}", e);
        }
    }

    /// Sends the reply, if any, and schedules its deletion when requested.
    async fn deliver(
        &self,
        chat_id: ChatId,
        result: &CommandResult,
    ) -> Result<Option<SentMessage>, TelegramError> {
        let Some(reply) = result.reply.clone() else {
            return Ok(None);
        };

        let sent = self.api.send_message(chat_id, reply).await?;

        if let Some(delay) = result.auto_delete {
            self.scheduler
                .schedule_deletion(sent.chat_id, sent.message_id, delay)
                .await;
        }

        Ok(Some(sent))
    }
}

impl<A: ChatApi> std::fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handler", &self.handler)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
