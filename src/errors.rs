// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::{TaskId, TaskState};

#[derive(Error, Debug)]
pub enum OpqueueError {
    #[error("Cycle detected: {task} cannot depend on {dependency}")]
    CycleDetected { task: TaskId, dependency: TaskId },

    #[error("Unknown dependency: {0}")]
    UnknownDependency(TaskId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task {task} is {state}; dependencies can only change before it runs")]
    InvalidState { task: TaskId, state: TaskState },

    #[error("Scheduler is shut down and no longer accepts tasks")]
    ShutDown,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OpqueueError>;

/// Error reported by a task's work.
///
/// Stored in [`TaskOutcome::Failed`](crate::types::TaskOutcome::Failed) and
/// never returned to the submitter directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line.
        Self::new(format!("{err:#}"))
    }
}
