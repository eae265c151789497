//! Update loop supervisor.
//!
//! Pulls events from the [`EventSource`] and spawns one task per event, so a
//! slow reply never holds up receiving. When the update stream breaks, the
//! loop is restarted after `min(60 * attempt, 300)` seconds, up to
//! `max_restarts` times.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::Dispatcher;
use crate::telegram::{ChatApi, EventSource, TelegramError};

/// Backoff step between restarts.
const RESTART_STEP_SECS: u64 = 60;

/// Longest pause between restarts.
const MAX_RESTART_DELAY_SECS: u64 = 300;

/// Messages that can be sent to the supervisor.
#[derive(Debug, Clone)]
pub enum SupervisorMessage {
    /// Stop receiving updates.
    Shutdown,
}

/// Why the supervisor stopped on its own.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Update loop failed {attempts} times, giving up: {last_error}")]
    GaveUp {
        attempts: u32,
        last_error: TelegramError,
    },
}

/// Delay before restart number `attempt` (1-based).
#[must_use]
pub fn restart_delay(attempt: u32) -> Duration {
    Duration::from_secs((RESTART_STEP_SECS * u64::from(attempt)).min(MAX_RESTART_DELAY_SECS))
}

/// Keeps the update loop running.
pub struct Supervisor<S, A>
where
    A: ChatApi,
    S: EventSource<Callback = <A as ChatApi>::Callback>,
{
    /// Where events come from.
    source: Arc<S>,

    /// Where events go.
    dispatcher: Arc<Dispatcher<A>>,

    /// Failures tolerated before giving up.
    max_restarts: u32,
}

impl<S, A> Supervisor<S, A>
where
    A: ChatApi,
    S: EventSource<Callback = <A as ChatApi>::Callback>,
{
    /// Creates a supervisor.
    #[must_use]
    pub const fn new(source: Arc<S>, dispatcher: Arc<Dispatcher<A>>, max_restarts: u32) -> Self {
        Self {
            source,
            dispatcher,
            max_restarts,
        }
    }

    /// Runs until shutdown is requested or the restart budget is spent.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<SupervisorMessage>,
    ) -> Result<(), SupervisorError> {
        let mut attempts = 0;

        loop {
            info!("Starting update loop...");

            let err = tokio::select! {
                msg = rx.recv() => {
                    log_stop(msg);
                    return Ok(());
                }
                err = self.pump() => err,
            };

            attempts += 1;
            error!(
                "Update loop crashed (attempt {}/{}): {}",
                attempts, self.max_restarts, err
            );

            if attempts >= self.max_restarts {
                error!("Max restarts reached. Update loop shutting down.");
                return Err(SupervisorError::GaveUp {
                    attempts,
                    last_error: err,
                });
            }

            let delay = restart_delay(attempts);
            warn!("Restarting update loop in {} seconds...", delay.as_secs());

            tokio::select! {
                msg = rx.recv() => {
                    log_stop(msg);
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Receives events until the source fails.
    ///
    /// Errors that only affect one update are logged and skipped.
    async fn pump(&self) -> TelegramError {
        loop {
            match self.source.next_event().await {
                Ok(event) => {
                    let dispatcher = Arc::clone(&self.dispatcher);
                    tokio::spawn(async move {
                        dispatcher.dispatch(event).await;
                    });
                }
                Err(e) if e.is_stream_failure() => return e,
                Err(e) => warn!("Skipping update: {}", e),
            }
        }
    }
}

fn log_stop(msg: Option<SupervisorMessage>) {
    match msg {
        Some(SupervisorMessage::Shutdown) => info!("Update loop shutting down"),
        None => info!("Supervisor channel closed, stopping update loop"),
    }
}

impl<S, A> std::fmt::Debug for Supervisor<S, A>
where
    A: ChatApi,
    S: EventSource<Callback = <A as ChatApi>::Callback>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("max_restarts", &self.max_restarts)
            .finish_non_exhaustive()
    }
}
