//! In-memory usage statistics.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

/// Invocation counts keyed by name, since process start.
#[derive(Debug, Clone, Default)]
pub struct CommandCounter {
    counts: HashMap<String, u64>,
}

impl CommandCounter {
    /// Increments the count for `name` and returns the new value.
    pub fn record(&mut self, name: &str) -> u64 {
        let count = self.counts.entry(name.to_owned()).or_insert(0);
        *count += 1;
        *count
    }

    /// Returns how often `name` was recorded.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

/// Counters shared by all update handlers.
#[derive(Debug)]
pub struct UsageStats {
    /// Per-command invocations.
    commands: Mutex<CommandCounter>,

    /// Per-label link requests.
    links: Mutex<CommandCounter>,

    /// When the process started serving.
    started_at: DateTime<Utc>,
}

impl Default for UsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageStats {
    /// Creates empty statistics starting now.
    #[must_use]
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    /// Creates empty statistics with an explicit start time.
    #[must_use]
    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            commands: Mutex::new(CommandCounter::default()),
            links: Mutex::new(CommandCounter::default()),
            started_at,
        }
    }

    /// Records a command invocation and returns the command counters as
    /// they stood right after it.
    ///
    /// The snapshot is taken under the same lock as the increment, so
    /// concurrent callers each see a distinct count.
    pub async fn record_command(&self, name: &str) -> CommandCounter {
        let mut commands = self.commands.lock().await;
        commands.record(name);
        commands.clone()
    }

    /// Records a link request and returns its new count.
    pub async fn record_link(&self, label: &str) -> u64 {
        self.links.lock().await.record(label)
    }

    /// Snapshot of the link counters.
    pub async fn links(&self) -> CommandCounter {
        self.links.lock().await.clone()
    }

    /// Time elapsed since start.
    #[must_use]
    pub fn uptime(&self) -> TimeDelta {
        Utc::now() - self.started_at
    }
}

/// Formats an uptime as `2d 3h 4m`, `3h 4m`, `4m 5s` or `5s`.
#[must_use]
pub fn format_uptime(uptime: TimeDelta) -> String {
    let secs = uptime.num_seconds().max(0);
    let (days, hours, mins, secs) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60, secs % 60);

    if days > 0 {
        format!("{days}d {hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
