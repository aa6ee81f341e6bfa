// src/observe/mod.rs

//! Task state observation.
//!
//! The engine publishes one [`TaskEvent`] per state transition while holding
//! the scheduler lock, so events for a task are queued in the order its
//! transitions happened. A single dispatcher task delivers them to
//! subscribers without holding any lock, which keeps it safe for a handler to
//! subscribe or unsubscribe from inside a delivery.
//!
//! - [`registry`] stores subscriptions and matches events against them.
//! - [`dispatcher`] owns the delivery loop and the publishing hub.

use std::sync::Arc;

use crate::dag::task_info::TaskInfo;
use crate::types::{Priority, TaskId, TaskState};

pub mod dispatcher;
pub mod registry;

pub use dispatcher::ObserverHub;
pub use registry::SubscriberRegistry;

/// A single state transition of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub task: TaskId,
    /// State the task entered.
    pub state: TaskState,
    pub priority: Priority,
    pub label: Option<Arc<str>>,
}

impl TaskEvent {
    pub(crate) fn from_info(info: &TaskInfo) -> Self {
        Self {
            task: info.id,
            state: info.state,
            priority: info.priority,
            label: info.label.clone(),
        }
    }
}

/// Which tasks a subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Task(TaskId),
    All,
}

impl Interest {
    pub fn matches(&self, event: &TaskEvent) -> bool {
        match self {
            Interest::Task(id) => *id == event.task,
            Interest::All => true,
        }
    }
}

/// Token returned by `subscribe`; pass it to `unsubscribe` to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub(crate) u64);

/// Callback invoked for each matching event, on the dispatcher task.
pub type EventHandler = Arc<dyn Fn(&TaskEvent) + Send + Sync>;
