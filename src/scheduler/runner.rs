//! Delayed deletion scheduler.
//!
//! Each scheduled deletion is its own tokio task:
//! 1. Sleep until the deadline
//! 2. Remove the entry from the pending set (a missing entry means it was
//!    cancelled)
//! 3. Issue one delete request; failures are logged and never retried
//!
//! Scheduling holds the pending-set lock while spawning, so a zero-delay
//! task cannot look up its entry before it has been inserted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::state::{DeletionKey, PendingDeletion, PendingSet};
use crate::telegram::{ChatApi, ChatId, MessageId};

/// Deletes previously sent messages after a delay.
pub struct DeletionScheduler<A: ChatApi> {
    /// Transport used for the delete requests.
    api: Arc<A>,

    /// Deletions that have not fired yet.
    pending: Arc<Mutex<PendingSet>>,

    /// Set by [`Self::shutdown`]; no new deletions are accepted afterwards.
    closed: Arc<AtomicBool>,
}

impl<A: ChatApi> Clone for DeletionScheduler<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            pending: Arc::clone(&self.pending),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<A: ChatApi> DeletionScheduler<A> {
    /// Creates a scheduler that deletes through the given transport.
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            pending: Arc::new(Mutex::new(PendingSet::default())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Schedules `message_id` in `chat_id` for deletion after `delay`.
    ///
    /// Returns immediately. Returns `false` if a deletion is already pending
    /// for that message or the scheduler has been shut down, in which case
    /// nothing new is scheduled.
    pub async fn schedule_deletion(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        delay: Duration,
    ) -> bool {
        let key = (chat_id, message_id);
        let mut pending = self.pending.lock().await;

        if self.closed.load(Ordering::Acquire) {
            debug!(
                "Scheduler is shut down, not deleting message {} in chat {}",
                message_id, chat_id
            );
            return false;
        }

        if pending.contains(&key) {
            debug!(
                "Deletion of message {} in chat {} already scheduled",
                message_id, chat_id
            );
            return false;
        }

        let deadline = Instant::now() + delay;
        let task = tokio::spawn(run_deletion(
            Arc::clone(&self.api),
            Arc::clone(&self.pending),
            key,
            deadline,
        ));
        pending.insert(PendingDeletion::new(chat_id, message_id, deadline, task));

        debug!(
            "Scheduled deletion of message {} in chat {} in {:?}",
            message_id, chat_id, delay
        );
        true
    }

    /// Cancels a pending deletion. Returns `false` if none was pending.
    pub async fn cancel(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        let removed = self.pending.lock().await.remove(&(chat_id, message_id));
        match removed {
            Some(pending) => {
                pending.abort();
                debug!("Cancelled deletion of message {} in chat {}", message_id, chat_id);
                true
            }
            None => false,
        }
    }

    /// Number of deletions that have not fired yet.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Abandons every pending deletion and returns how many were dropped.
    ///
    /// The affected messages stay in their chats, and later calls to
    /// [`Self::schedule_deletion`] are refused.
    pub async fn shutdown(&self) -> usize {
        let mut pending = self.pending.lock().await;
        self.closed.store(true, Ordering::Release);
        let mut abandoned = 0;
        for entry in pending.drain() {
            entry.abort();
            abandoned += 1;
        }

        if abandoned > 0 {
            info!("Abandoned {} pending deletion(s) on shutdown", abandoned);
        }
        abandoned
    }
}

impl<A: ChatApi> std::fmt::Debug for DeletionScheduler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionScheduler").finish_non_exhaustive()
    }
}

async fn run_deletion<A: ChatApi>(
    api: Arc<A>,
    pending: Arc<Mutex<PendingSet>>,
    key: DeletionKey,
    deadline: Instant,
) {
    sleep_until(deadline).await;

    if pending.lock().await.remove(&key).is_none() {
        return;
    }

    let (chat_id, message_id) = key;
    match api.delete_message(chat_id, message_id).await {
        Ok(()) => debug!("Auto-deleted message {} from chat {}", message_id, chat_id),
        Err(e) => warn!("Failed to delete message {} in chat {}: {}", message_id, chat_id, e),
    }
}
