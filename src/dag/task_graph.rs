// src/dag/task_graph.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::GraphStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{StartedTask, TaskInfo, TaskSpec};
use crate::errors::{OpqueueError, Result, TaskError};
use crate::observe::TaskEvent;
use crate::types::{Priority, StateCounts, TaskId, TaskOutcome, TaskState};

/// The dependency graph plus the lifecycle state of every registered task.
///
/// It is responsible for:
/// - validating and registering tasks (unknown dependencies, cycles)
/// - deciding when a task is ready (all dependencies completed)
/// - recording results and promoting dependents on completion
/// - propagating cancellation to dependents
///
/// `TaskGraph` is synchronous and performs no IO. The engine wraps it in a
/// mutex; every method here runs with that lock held.
#[derive(Debug)]
pub struct TaskGraph {
    graph: DagGraph,
    tasks: HashMap<TaskId, TaskInfo>,
    /// Next id to hand out. Only advanced once a registration commits.
    next_id: u64,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            graph: DagGraph::new(),
            tasks: HashMap::new(),
            next_id: 1,
        }
    }

    /// Number of registered (not yet pruned) tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn status(&self, id: TaskId) -> Option<TaskState> {
        self.tasks.get(&id).map(|info| info.state)
    }

    pub fn outcome(&self, id: TaskId) -> Option<TaskOutcome> {
        self.tasks.get(&id).and_then(|info| info.outcome.clone())
    }

    pub fn priority_of(&self, id: TaskId) -> Option<Priority> {
        self.tasks.get(&id).map(|info| info.priority)
    }

    pub fn label_of(&self, id: TaskId) -> Option<Arc<str>> {
        self.tasks.get(&id).and_then(|info| info.label.clone())
    }

    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.graph.dependencies_of(id)
    }

    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.graph.dependents_of(id)
    }

    /// All registered task ids, sorted.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.graph.tasks()
    }

    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for info in self.tasks.values() {
            counts.record(info.state);
        }
        counts
    }

    /// Register a new task.
    ///
    /// Fails with `UnknownDependency` or `CycleDetected` without touching the
    /// graph. On success the task is `Ready` if every dependency has already
    /// completed, `Cancelled` if some dependency was cancelled, and `Pending`
    /// otherwise.
    pub fn register(&mut self, spec: TaskSpec) -> Result<(TaskId, GraphStep)> {
        let id = TaskId(self.next_id);

        let mut deps: Vec<TaskId> = Vec::with_capacity(spec.deps.len());
        for dep in spec.deps.iter().copied() {
            if !self.tasks.contains_key(&dep) {
                return Err(OpqueueError::UnknownDependency(dep));
            }
            if self.graph.would_cycle(id, dep) {
                return Err(OpqueueError::CycleDetected {
                    task: id,
                    dependency: dep,
                });
            }
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        // Commit.
        self.next_id += 1;
        self.graph.add_task(id, &deps);
        let info = TaskInfo::new(id, spec, deps);
        debug!(
            task = %id,
            priority = ?info.priority,
            label = info.label.as_deref().unwrap_or(""),
            deps = ?info.deps,
            "registered task"
        );
        self.tasks.insert(id, info);

        let mut step = GraphStep::new();
        let dep_cancelled = self.tasks[&id]
            .deps
            .iter()
            .any(|dep| self.cancel_requested(*dep));

        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        if dep_cancelled {
            info!(task = %id, "dependency already cancelled; cancelling new task");
            step.extend(manager.cancel_cascade(id));
        } else if let Some(event) = manager.promote_if_ready(id) {
            step.push(event);
        }

        Ok((id, step))
    }

    /// `Cancelled`, or `Running` with its cancel flag raised.
    fn cancel_requested(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|info| match info.state {
            TaskState::Cancelled => true,
            TaskState::Running => info.cancel.is_cancelled(),
            _ => false,
        })
    }

    /// Make `task` wait for `dependency` as well.
    ///
    /// Only allowed while `task` has not started. A `Ready` task whose new
    /// dependency has not completed goes back to `Pending`; a task given an
    /// already-cancelled dependency is cancelled together with its
    /// dependents.
    pub fn add_dependency(&mut self, task: TaskId, dependency: TaskId) -> Result<GraphStep> {
        let state = self.status(task).ok_or(OpqueueError::TaskNotFound(task))?;
        let dep_state = self
            .status(dependency)
            .ok_or(OpqueueError::UnknownDependency(dependency))?;
        let dep_cancelled = self.cancel_requested(dependency);

        if !matches!(state, TaskState::Pending | TaskState::Ready) {
            return Err(OpqueueError::InvalidState { task, state });
        }
        if self.graph.would_cycle(task, dependency) {
            return Err(OpqueueError::CycleDetected { task, dependency });
        }

        let mut step = GraphStep::new();
        let Some(info) = self.tasks.get_mut(&task) else {
            return Err(OpqueueError::TaskNotFound(task));
        };
        if info.deps.contains(&dependency) {
            return Ok(step);
        }

        info.deps.push(dependency);
        self.graph.add_edge(dependency, task);
        debug!(task = %task, dep = %dependency, "added dependency");

        match dep_state {
            _ if dep_cancelled => {
                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                step.extend(manager.cancel_cascade(task));
            }
            TaskState::Completed => {}
            _ => {
                if info.state == TaskState::Ready {
                    info.state = TaskState::Pending;
                    debug!(task = %task, "new dependency not complete; back to Pending");
                    step.push(TaskEvent::from_info(info));
                }
            }
        }

        Ok(step)
    }

    /// Move a `Ready` task to `Running` and hand out its work.
    ///
    /// Returns `None` if the task is unknown or no longer `Ready` (for example
    /// it was cancelled after being queued).
    pub fn start(&mut self, id: TaskId) -> Option<(StartedTask, GraphStep)> {
        let info = self.tasks.get_mut(&id)?;
        if info.state != TaskState::Ready {
            debug!(task = %id, state = %info.state, "task not ready; not starting");
            return None;
        }

        let Some(work) = info.take_work() else {
            warn!(task = %id, "ready task has no work; marking failed");
            info.finish(TaskOutcome::Failed(TaskError::new("task has no work")));
            return None;
        };

        info.state = TaskState::Running;
        let mut step = GraphStep::new();
        step.push(TaskEvent::from_info(info));

        let started = StartedTask {
            id,
            priority: info.priority,
            label: info.label.clone(),
            work,
            context: info.context(),
        };
        Some((started, step))
    }

    /// Record the result of a running task.
    ///
    /// - cancel flag raised while running → `Cancelled`
    /// - `Ok` → `Completed`, and newly satisfied dependents become `Ready`
    /// - `Err` → `Failed`; dependents are left `Pending`
    pub fn finish(&mut self, id: TaskId, result: std::result::Result<(), TaskError>) -> GraphStep {
        let mut step = GraphStep::new();

        let Some(info) = self.tasks.get_mut(&id) else {
            warn!(task = %id, "completion for unknown task; ignoring");
            return step;
        };
        if info.state != TaskState::Running {
            warn!(task = %id, state = %info.state, "completion for task that is not running; ignoring");
            return step;
        }

        if info.cancel.is_cancelled() {
            info!(task = %id, "running task observed cancellation");
            info.finish(TaskOutcome::Cancelled);
            step.push(TaskEvent::from_info(info));
            // Catch dependents attached after the cancel was requested.
            let mut manager = StateManager::new(&self.graph, &mut self.tasks);
            step.extend(manager.cancel_dependents(id));
            return step;
        }

        match result {
            Ok(()) => {
                info.finish(TaskOutcome::Success);
                debug!(task = %id, "task completed successfully");
                step.push(TaskEvent::from_info(info));
                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                step.extend(manager.promote_dependents(id));
            }
            Err(err) => {
                warn!(
                    task = %id,
                    error = %err,
                    dependents = ?self.graph.dependents_of(id),
                    "task failed; dependents stay pending"
                );
                info.finish(TaskOutcome::Failed(err));
                step.push(TaskEvent::from_info(info));
            }
        }

        step
    }

    /// Cancel a task and propagate to everything depending on it.
    ///
    /// Unknown ids and terminal tasks are ignored; cancelling twice is the
    /// same as cancelling once.
    pub fn cancel(&mut self, id: TaskId) -> GraphStep {
        if !self.contains(id) {
            warn!(task = %id, "cancel for unknown task; ignoring");
            return GraphStep::new();
        }
        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        manager.cancel_cascade(id)
    }

    /// Cancel every transitive dependent of `id` but not `id` itself.
    ///
    /// This is the opt-in cascade for failures: failing a task never cancels
    /// its dependents on its own.
    pub fn cancel_dependents(&mut self, id: TaskId) -> GraphStep {
        if !self.contains(id) {
            warn!(task = %id, "cancel_dependents for unknown task; ignoring");
            return GraphStep::new();
        }
        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        manager.cancel_dependents(id)
    }

    /// `Pending` tasks that can never become ready because a transitive
    /// dependency failed.
    pub fn stalled(&self) -> Vec<TaskId> {
        let ro = ReadOnlyStateManager::new(&self.tasks);
        let mut ids: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|info| info.state == TaskState::Pending && ro.blocked_by_failure(info))
            .map(|info| info.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Remove terminal tasks whose dependents are all terminal as well.
    ///
    /// Pruned ids are forgotten: they can no longer be queried or used as
    /// dependencies.
    pub fn prune(&mut self) -> Vec<TaskId> {
        let removable: Vec<TaskId> = self
            .graph
            .tasks()
            .into_iter()
            .filter(|id| {
                self.status(*id).is_some_and(TaskState::is_terminal)
                    && self
                        .graph
                        .dependents_of(*id)
                        .iter()
                        .all(|d| self.status(*d).is_none_or(TaskState::is_terminal))
            })
            .collect();

        for id in &removable {
            self.graph.remove_task(*id);
            self.tasks.remove(id);
        }

        if !removable.is_empty() {
            debug!(count = removable.len(), "pruned terminal tasks");
        }
        removable
    }
}
