//! Task registry
//!
//! Tracks every background crawl of the process by execution id so it can be
//! inspected, awaited or cancelled after the caller got its acknowledgment.

use crate::error::{Error, Result};
use crate::execution::ExecutionStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a background crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "status", rename_all = "snake_case")]
pub enum TaskState {
    /// Registered, not yet running
    Started,
    /// Crawl loop running
    Running,
    /// Terminal status written
    Finished(ExecutionStatus),
}

impl TaskState {
    /// Whether the task has finished
    pub fn is_finished(self) -> bool {
        matches!(self, TaskState::Finished(_))
    }
}

/// Point-in-time view of a task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    /// Execution identifier
    pub execution_id: String,
    /// Current state
    pub state: TaskState,
    /// Whether cancellation was requested
    pub cancel_requested: bool,
    /// Registration time
    pub started_at: DateTime<Utc>,
    /// Completion time
    pub finished_at: Option<DateTime<Utc>>,
}

struct TaskEntry {
    token: CancellationToken,
    state: watch::Sender<TaskState>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskEntry {
    fn snapshot(&self, id: &str) -> TaskSnapshot {
        TaskSnapshot {
            execution_id: id.to_string(),
            state: *self.state.borrow(),
            cancel_requested: self.token.is_cancelled(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Process-wide map of execution id to background task
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, TaskEntry>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task and hand out its cancellation token
    pub async fn register(&self, id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let (state, _) = watch::channel(TaskState::Started);
        self.tasks.write().await.insert(
            id.to_string(),
            TaskEntry {
                token: token.clone(),
                state,
                started_at: Utc::now(),
                finished_at: None,
            },
        );
        token
    }

    /// Mark a task as running
    pub async fn mark_running(&self, id: &str) {
        if let Some(entry) = self.tasks.read().await.get(id) {
            entry.state.send_replace(TaskState::Running);
        }
    }

    /// Mark a task as finished with its terminal status
    pub async fn mark_finished(&self, id: &str, status: ExecutionStatus) {
        if let Some(entry) = self.tasks.write().await.get_mut(id) {
            entry.finished_at = Some(Utc::now());
            entry.state.send_replace(TaskState::Finished(status));
        }
    }

    /// Request cancellation
    ///
    /// Returns `false` when the task already finished.
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        let tasks = self.tasks.read().await;
        let entry = tasks.get(id).ok_or_else(|| Error::not_found(id))?;
        if entry.state.borrow().is_finished() {
            return Ok(false);
        }
        entry.token.cancel();
        Ok(true)
    }

    /// Snapshot of one task
    pub async fn snapshot(&self, id: &str) -> Option<TaskSnapshot> {
        self.tasks.read().await.get(id).map(|entry| entry.snapshot(id))
    }

    /// Snapshots of all tasks, oldest first
    pub async fn list(&self) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<TaskSnapshot> = self
            .tasks
            .read()
            .await
            .iter()
            .map(|(id, entry)| entry.snapshot(id))
            .collect();
        snapshots.sort_by_key(|s| s.started_at);
        snapshots
    }

    /// Wait for a task to finish and return its terminal status
    pub async fn wait(&self, id: &str) -> Result<ExecutionStatus> {
        let mut rx = self
            .tasks
            .read()
            .await
            .get(id)
            .map(|entry| entry.state.subscribe())
            .ok_or_else(|| Error::not_found(id))?;

        loop {
            let state = *rx.borrow_and_update();
            if let TaskState::Finished(status) = state {
                return Ok(status);
            }
            rx.changed()
                .await
                .map_err(|_| Error::Other(format!("task '{id}' was dropped")))?;
        }
    }

    /// Keep at most `keep` finished tasks, dropping the oldest finished first
    ///
    /// Running tasks are never dropped. Returns how many entries were removed.
    pub async fn retain_finished(&self, keep: usize) -> usize {
        let mut tasks = self.tasks.write().await;
        let mut finished: Vec<(DateTime<Utc>, String)> = tasks
            .iter()
            .filter_map(|(id, entry)| entry.finished_at.map(|at| (at, id.clone())))
            .collect();
        if finished.len() <= keep {
            return 0;
        }

        finished.sort();
        let excess = finished.len() - keep;
        for (_, id) in finished.into_iter().take(excess) {
            tasks.remove(&id);
        }
        excess
    }

    /// Number of tracked tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether no task is tracked
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry").finish_non_exhaustive()
    }
}
