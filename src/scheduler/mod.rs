//! Auto-delete scheduler module.
//!
//! Removes messages sent by the bot once their configured delay elapses,
//! without blocking update handling.

mod runner;
mod state;

pub use runner::DeletionScheduler;
pub use state::{DeletionKey, PendingDeletion, PendingSet};
