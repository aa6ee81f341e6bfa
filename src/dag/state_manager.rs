// src/dag/state_manager.rs

//! Readiness promotion and cancellation propagation.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::dag::DagGraph;
use crate::dag::scheduler_step::GraphStep;
use crate::dag::task_info::TaskInfo;
use crate::observe::TaskEvent;
use crate::types::{TaskId, TaskOutcome, TaskState};

/// Applies state transitions that touch more than one task.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskId, TaskInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DagGraph, tasks: &'a mut HashMap<TaskId, TaskInfo>) -> Self {
        Self { graph, tasks }
    }

    /// Promote `id` to `Ready` if it is `Pending` and every dependency is
    /// `Completed`.
    pub fn promote_if_ready(&mut self, id: TaskId) -> Option<TaskEvent> {
        let satisfied = {
            let info = self.tasks.get(&id)?;
            info.state == TaskState::Pending
                && ReadOnlyStateManager::new(&*self.tasks).deps_satisfied_for_info(info)
        };
        if !satisfied {
            return None;
        }

        let info = self.tasks.get_mut(&id)?;
        info.state = TaskState::Ready;
        debug!(task = %id, priority = ?info.priority, "dependencies satisfied; marking Ready");
        Some(TaskEvent::from_info(info))
    }

    /// Re-evaluate every direct dependent of a task that just completed.
    pub fn promote_dependents(&mut self, completed: TaskId) -> GraphStep {
        let mut step = GraphStep::new();
        for dependent in self.graph.dependents_of(completed) {
            if let Some(event) = self.promote_if_ready(dependent) {
                step.push(event);
            }
        }
        step
    }

    /// Cancel `root` and everything that transitively depends on it.
    ///
    /// - `Pending`/`Ready` tasks become `Cancelled` at once.
    /// - `Running` tasks get their cancel flag raised and finish as
    ///   `Cancelled` once their work returns.
    /// - `Completed`/`Failed` tasks are left alone and stop the traversal.
    /// - Already-`Cancelled` tasks stop the traversal too: their dependents
    ///   were cancelled together with them.
    pub fn cancel_cascade(&mut self, root: TaskId) -> GraphStep {
        self.cancel_from(vec![root])
    }

    /// Cancel every transitive dependent of `id`, leaving `id` itself as is.
    pub fn cancel_dependents(&mut self, id: TaskId) -> GraphStep {
        self.cancel_from(self.graph.dependents_of(id))
    }

    fn cancel_from(&mut self, roots: Vec<TaskId>) -> GraphStep {
        let mut step = GraphStep::new();
        let mut stack = roots;
        let mut visited: HashSet<TaskId> = HashSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let Some(info) = self.tasks.get_mut(&id) else {
                warn!(task = %id, "node in DAG not present in tasks map");
                continue;
            };

            match info.state {
                TaskState::Pending | TaskState::Ready => {
                    info.cancel.cancel();
                    info.finish(TaskOutcome::Cancelled);
                    debug!(task = %id, "cancelled before running");
                    step.push(TaskEvent::from_info(info));
                }
                TaskState::Running => {
                    if info.cancel.cancel() {
                        debug!(task = %id, "cancellation requested for running task");
                    }
                }
                TaskState::Completed | TaskState::Failed | TaskState::Cancelled => {
                    continue;
                }
            }

            // Reverse so the lowest id is popped (and cancelled) first.
            stack.extend(self.graph.dependents_of(id).into_iter().rev());
        }

        step
    }
}

/// Read-only queries over the task map.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskId, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskId, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Whether every dependency of `info` has `Completed`.
    ///
    /// A dependency missing from the map (pruned while still referenced) is
    /// treated as unsatisfied.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep| match self.tasks.get(dep) {
            Some(d) => d.state == TaskState::Completed,
            None => {
                warn!(task = %info.id, dep = %dep, "dependency missing from tasks map");
                false
            }
        })
    }

    /// Whether some transitive dependency of `info` has `Failed`, so it can
    /// never become ready.
    pub fn blocked_by_failure(&self, info: &TaskInfo) -> bool {
        let mut stack: Vec<TaskId> = info.deps.clone();
        let mut visited: HashSet<TaskId> = HashSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(dep) = self.tasks.get(&id) else {
                continue;
            };
            match dep.state {
                TaskState::Failed => return true,
                TaskState::Completed => {}
                _ => stack.extend(dep.deps.iter().copied()),
            }
        }

        false
    }
}
