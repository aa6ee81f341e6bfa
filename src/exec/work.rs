// src/exec/work.rs

//! Work units and the context handed to them while they run.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::TaskError;
use crate::types::{Priority, TaskId};

/// Boxed work unit owned by a task until a worker executes it.
///
/// Work runs on a blocking thread and may block. It should poll
/// [`TaskContext::is_cancelled`] at convenient points and return early once
/// cancellation has been requested; nothing interrupts it forcibly.
pub type Work = Box<dyn FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static>;

/// Shared cancellation flag for a single task.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` if this call raised it.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Read-only view of the task a work unit belongs to.
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    priority: Priority,
    label: Option<Arc<str>>,
    cancel: CancelFlag,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        priority: Priority,
        label: Option<Arc<str>>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            id,
            priority,
            label,
            cancel,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether cancellation was requested for this task.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Convenience for the early-exit pattern:
    ///
    /// ```ignore
    /// ctx.check_cancelled()?;
    /// ```
    pub fn check_cancelled(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::new(format!("task {} cancelled", self.id)))
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
