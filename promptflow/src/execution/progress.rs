//! Task progress reporting.

use crate::pipeline::TaskType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};

/// Progress of one task, reported before and after it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    /// Task name.
    pub name: String,
    /// Task title.
    pub title: String,
    /// The task has been launched.
    pub is_started: bool,
    /// The task has produced its parameter.
    pub is_done: bool,
    /// Kind of task.
    pub task_type: TaskType,
    /// Parameter the task produces.
    pub parameter_name: String,
    /// Produced value, once done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_value: Option<String>,
}

/// Receives task progress.
///
/// Implementations must not fail; a sink that cannot deliver should drop
/// the update.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Handles one progress update.
    async fn on_progress(&self, progress: TaskProgress);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn on_progress(&self, _progress: TaskProgress) {}
}

/// Turns progress into `tracing` events.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingProgressSink {
    /// Creates a sink logging at `level` (`INFO` or `DEBUG`).
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates an info-level sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn on_progress(&self, progress: TaskProgress) {
        let state = if progress.is_done { "done" } else { "started" };

        if self.level == Level::INFO {
            info!(
                task = %progress.name,
                task_type = %progress.task_type,
                parameter = %progress.parameter_name,
                "Task {}: {}", state, progress.title
            );
        } else {
            debug!(
                task = %progress.name,
                task_type = %progress.task_type,
                parameter = %progress.parameter_name,
                value = ?progress.parameter_value,
                "Task {}: {}", state, progress.title
            );
        }
    }
}

/// Keeps every update, for tests.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    updates: parking_lot::RwLock<Vec<TaskProgress>>,
}

impl CollectingProgressSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all updates in arrival order.
    #[must_use]
    pub fn updates(&self) -> Vec<TaskProgress> {
        self.updates.read().clone()
    }

    /// Returns the updates of one task.
    #[must_use]
    pub fn updates_of(&self, task_name: &str) -> Vec<TaskProgress> {
        self.updates
            .read()
            .iter()
            .filter(|p| p.name == task_name)
            .cloned()
            .collect()
    }

    /// Returns the number of updates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.read().len()
    }

    /// Returns true if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.read().is_empty()
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn on_progress(&self, progress: TaskProgress) {
        self.updates.write().push(progress);
    }
}
