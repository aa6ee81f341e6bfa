// src/dag/task_info.rs

//! Task metadata, submission specs and started-task handoff types.

use std::fmt;
use std::sync::Arc;

use crate::errors::TaskError;
use crate::exec::{CancelFlag, TaskContext, Work};
use crate::types::{Priority, TaskId, TaskOutcome, TaskState};

/// Everything needed to submit one task.
pub struct TaskSpec {
    pub(crate) work: Work,
    pub(crate) priority: Priority,
    pub(crate) deps: Vec<TaskId>,
    pub(crate) label: Option<Arc<str>>,
}

impl TaskSpec {
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static,
    {
        Self {
            work: Box::new(work),
            priority: Priority::default(),
            deps: Vec::new(),
            label: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Add a dependency. Duplicates are ignored at registration.
    pub fn after(mut self, dep: TaskId) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn after_all(mut self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        self.deps.extend(deps);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Arc::from(label.into()));
        self
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("priority", &self.priority)
            .field("deps", &self.deps)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Registered task: static identity plus mutable lifecycle state.
pub struct TaskInfo {
    pub id: TaskId,
    pub priority: Priority,
    pub label: Option<Arc<str>>,
    /// Direct dependencies, deduplicated, in declaration order.
    pub deps: Vec<TaskId>,
    pub state: TaskState,
    /// Set once, together with the terminal state.
    pub outcome: Option<TaskOutcome>,
    pub cancel: CancelFlag,
    /// Taken by the worker that starts the task.
    work: Option<Work>,
}

impl TaskInfo {
    pub(crate) fn new(id: TaskId, spec: TaskSpec, deps: Vec<TaskId>) -> Self {
        Self {
            id,
            priority: spec.priority,
            label: spec.label,
            deps,
            state: TaskState::Pending,
            outcome: None,
            cancel: CancelFlag::new(),
            work: Some(spec.work),
        }
    }

    /// Move into a terminal state, recording the outcome and dropping any
    /// work that never ran.
    pub(crate) fn finish(&mut self, outcome: TaskOutcome) {
        self.state = outcome.state();
        self.outcome = Some(outcome);
        self.work = None;
    }

    pub(crate) fn take_work(&mut self) -> Option<Work> {
        self.work.take()
    }

    pub(crate) fn context(&self) -> TaskContext {
        TaskContext::new(self.id, self.priority, self.label.clone(), self.cancel.clone())
    }
}

impl fmt::Debug for TaskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInfo")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .field("deps", &self.deps)
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// A task a worker has just moved to `Running`, together with its work.
pub struct StartedTask {
    pub id: TaskId,
    pub priority: Priority,
    pub label: Option<Arc<str>>,
    pub work: Work,
    pub context: TaskContext,
}

impl fmt::Debug for StartedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartedTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
