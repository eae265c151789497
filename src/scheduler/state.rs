//! Pending deletion bookkeeping.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::telegram::{ChatId, MessageId};

/// Key identifying a message across chats.
pub type DeletionKey = (ChatId, MessageId);

/// A message waiting to be deleted.
#[derive(Debug)]
pub struct PendingDeletion {
    /// Chat the message lives in.
    pub chat_id: ChatId,

    /// Message to delete.
    pub message_id: MessageId,

    /// When the deletion fires.
    pub deadline: Instant,

    /// Task that sleeps until the deadline.
    task: JoinHandle<()>,
}

impl PendingDeletion {
    pub(super) fn new(
        chat_id: ChatId,
        message_id: MessageId,
        deadline: Instant,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            chat_id,
            message_id,
            deadline,
            task,
        }
    }

    /// Stops the waiting task; the message is left in place.
    pub(super) fn abort(self) {
        self.task.abort();
    }
}

/// All deletions that have not fired yet.
#[derive(Debug, Default)]
pub struct PendingSet {
    entries: HashMap<DeletionKey, PendingDeletion>,
}

impl PendingSet {
    /// Checks whether a deletion is already pending for the message.
    #[must_use]
    pub fn contains(&self, key: &DeletionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Records a pending deletion. The caller checks for duplicates first.
    pub fn insert(&mut self, pending: PendingDeletion) {
        self.entries
            .insert((pending.chat_id, pending.message_id), pending);
    }

    /// Removes and returns the pending deletion for the message.
    pub fn remove(&mut self, key: &DeletionKey) -> Option<PendingDeletion> {
        self.entries.remove(key)
    }

    /// Removes every pending deletion.
    pub fn drain(&mut self) -> impl Iterator<Item = PendingDeletion> + '_ {
        self.entries.drain().map(|(_, pending)| pending)
    }

    /// Number of pending deletions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
