//! In-memory [`ChatApi`] and [`EventSource`] for integration tests.
//!
//! `MockApi` records every send, delete and callback answer so tests can
//! assert on them without talking to Telegram. `MockSource` replays a
//! scripted list of events and then waits forever.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::time::Instant;

use community_link_bot::telegram::{
    ChatApi, ChatId, CommandInfo, EventSource, Incoming, MessageId, OutgoingMessage, SentMessage,
    TelegramError,
};

/// Callback handle used by the mocks.
pub type QueryId = u64;

/// One recorded `send_message` call that succeeded.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub sent: SentMessage,
    pub message: OutgoingMessage,
    pub at: Instant,
}

/// One recorded `delete_message` attempt.
#[derive(Debug, Clone, Copy)]
pub struct DeleteRecord {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub at: Instant,
    pub succeeded: bool,
}

/// Mock transport that numbers sent messages from 1.
#[derive(Debug, Default)]
pub struct MockApi {
    next_id: AtomicI32,
    failing_sends: AtomicUsize,
    fail_deletes: AtomicBool,
    sent: Mutex<Vec<SentRecord>>,
    deletes: Mutex<Vec<DeleteRecord>>,
    answers: Mutex<Vec<(QueryId, String)>>,
    commands: Mutex<Vec<CommandInfo>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` sends fail.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    /// Makes every delete fail.
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.message.html).collect()
    }

    pub fn deletes(&self) -> Vec<DeleteRecord> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn answers(&self) -> Vec<(QueryId, String)> {
        self.answers.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<CommandInfo> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for MockApi {
    type Callback = QueryId;

    async fn send_message(
        &self,
        chat_id: ChatId,
        message: OutgoingMessage,
    ) -> Result<SentMessage, TelegramError> {
        let failing = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TelegramError::Invocation("mock send failure".to_owned()));
        }

        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let sent = SentMessage {
            chat_id,
            message_id,
        };
        self.sent.lock().unwrap().push(SentRecord {
            sent,
            message,
            at: Instant::now(),
        });
        Ok(sent)
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TelegramError> {
        let succeeded = !self.fail_deletes.load(Ordering::SeqCst);
        self.deletes.lock().unwrap().push(DeleteRecord {
            chat_id,
            message_id,
            at: Instant::now(),
            succeeded,
        });

        if succeeded {
            Ok(())
        } else {
            Err(TelegramError::Invocation(
                "MESSAGE_DELETE_FORBIDDEN".to_owned(),
            ))
        }
    }

    async fn answer_callback(&self, query: &QueryId, text: &str) -> Result<(), TelegramError> {
        self.answers.lock().unwrap().push((*query, text.to_owned()));
        Ok(())
    }

    async fn set_commands(&self, commands: &[CommandInfo]) -> Result<(), TelegramError> {
        *self.commands.lock().unwrap() = commands.to_vec();
        Ok(())
    }
}

/// Event source that replays scripted results, then never yields again.
#[derive(Debug, Default)]
pub struct MockSource {
    script: Mutex<VecDeque<Result<Incoming<QueryId>, TelegramError>>>,
    polls: AtomicUsize,
}

impl MockSource {
    pub fn new(script: Vec<Result<Incoming<QueryId>, TelegramError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            polls: AtomicUsize::new(0),
        }
    }

    /// How many times `next_event` was called.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MockSource {
    type Callback = QueryId;

    async fn next_event(&self) -> Result<Incoming<QueryId>, TelegramError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }
}

/// A text message from user `sender_id` in chat `chat_id`.
pub fn text_message(chat_id: ChatId, sender_id: i64, text: &str) -> Incoming<QueryId> {
    Incoming::Message {
        chat_id,
        sender_id: Some(sender_id),
        sender_name: Some("Tester".to_owned()),
        text: text.to_owned(),
    }
}

/// A button press with callback `data`.
pub fn button_press(query: QueryId, chat_id: ChatId, data: &str) -> Incoming<QueryId> {
    Incoming::Callback {
        query,
        chat_id,
        sender_id: Some(100),
        data: data.to_owned(),
    }
}
