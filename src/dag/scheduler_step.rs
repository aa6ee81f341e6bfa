// src/dag/scheduler_step.rs

//! Step-by-step result type for graph mutations.

use crate::observe::TaskEvent;
use crate::types::{TaskId, TaskState};

/// Structured result of a single graph mutation.
///
/// Every state change is listed in the order it happened. The engine derives
/// ready-queue updates from it and publishes it to subscribers; tests use it
/// to step the graph by hand.
#[derive(Debug, Clone, Default)]
pub struct GraphStep {
    pub transitions: Vec<TaskEvent>,
}

impl GraphStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: TaskEvent) {
        self.transitions.push(event);
    }

    pub(crate) fn extend(&mut self, other: GraphStep) {
        self.transitions.extend(other.transitions);
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Tasks that entered `state` during this step.
    pub fn entered(&self, state: TaskState) -> Vec<TaskId> {
        self.transitions
            .iter()
            .filter(|ev| ev.state == state)
            .map(|ev| ev.task)
            .collect()
    }

    /// Tasks that became ready during this step.
    pub fn newly_ready(&self) -> Vec<TaskId> {
        self.entered(TaskState::Ready)
    }

    /// Tasks that were cancelled during this step.
    pub fn newly_cancelled(&self) -> Vec<TaskId> {
        self.entered(TaskState::Cancelled)
    }
}
