use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::TaskError;

/// Identifier of a submitted task.
///
/// Ids are handed out by a single scheduler instance, starting at 1, and are
/// never reused by that instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Raw numeric value of the id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(raw: u64) -> Self {
        TaskId(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Quality-of-service tier used to order the ready queue.
///
/// Variants are declared from lowest to highest so the derived `Ord` matches
/// dequeue order: a `UserInteractive` task always leaves the queue before a
/// `Background` one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Background,
    Utility,
    #[default]
    Default,
    UserInitiated,
    UserInteractive,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "").as_str() {
            "background" => Ok(Priority::Background),
            "utility" => Ok(Priority::Utility),
            "default" => Ok(Priority::Default),
            "userinitiated" => Ok(Priority::UserInitiated),
            "userinteractive" => Ok(Priority::UserInteractive),
            other => Err(format!(
                "invalid priority: {other} (expected background, utility, default, user_initiated or user_interactive)"
            )),
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Registered, waiting on at least one dependency.
    Pending,
    /// All dependencies completed; sitting in the ready queue.
    Ready,
    /// Picked up by a worker; its work is executing.
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    /// Whether the state is final. No task ever leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Result recorded exactly once, when a task reaches its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The work ran and reported an error (or panicked).
    Failed(TaskError),
    /// The task was cancelled, either before it ran or cooperatively while
    /// running.
    Cancelled,
}

impl TaskOutcome {
    /// Terminal state that corresponds to this outcome.
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Success => TaskState::Completed,
            TaskOutcome::Failed(_) => TaskState::Failed,
            TaskOutcome::Cancelled => TaskState::Cancelled,
        }
    }
}

/// Number of tasks per state, as tracked by the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub pending: usize,
    pub ready: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl StateCounts {
    pub(crate) fn record(&mut self, state: TaskState) {
        match state {
            TaskState::Pending => self.pending += 1,
            TaskState::Ready => self.ready += 1,
            TaskState::Running => self.running += 1,
            TaskState::Completed => self.completed += 1,
            TaskState::Failed => self.failed += 1,
            TaskState::Cancelled => self.cancelled += 1,
        }
    }

    /// Total number of tasks counted.
    pub fn total(&self) -> usize {
        self.pending + self.ready + self.running + self.completed + self.failed + self.cancelled
    }
}
