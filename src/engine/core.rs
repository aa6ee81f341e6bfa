// src/engine/core.rs

//! Pure core scheduler state machine.
//!
//! [`CoreRuntime`] combines the task graph and the ready queue and applies
//! every graph transition to the queue:
//! - `Ready` → pushed (or cancelled right away while draining)
//! - `Pending` / `Cancelled` → removed
//!
//! It has no locks, channels or Tokio types; the async shell in
//! [`super::runtime`] wraps it in a mutex and drives it from the workers.

use tracing::{debug, info};

use crate::dag::{GraphStep, ReadyQueue, StartedTask, TaskGraph, TaskSpec};
use crate::errors::{OpqueueError, Result, TaskError};
use crate::types::{TaskId, TaskState};

/// Lifecycle of the scheduler as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Normal operation.
    Accepting,
    /// `shutdown(drain = false)`: no new submissions; queued and newly
    /// promoted tasks still run.
    Finishing,
    /// `shutdown(drain = true)`: no new submissions; everything that is or
    /// becomes ready is cancelled.
    Draining,
}

/// What a worker should do next.
#[derive(Debug)]
pub enum NextTask {
    Start(StartedTask),
    /// Nothing runnable yet; wait for a wake-up.
    Wait,
    /// The scheduler is shutting down and this worker has nothing left to do.
    Stop,
}

#[derive(Debug)]
pub struct CoreRuntime {
    graph: TaskGraph,
    queue: ReadyQueue,
    phase: Phase,
    /// Tasks handed to a worker and not yet finished.
    running: usize,
    live_workers: usize,
}

impl CoreRuntime {
    pub fn new(workers: usize) -> Self {
        Self {
            graph: TaskGraph::new(),
            queue: ReadyQueue::new(),
            phase: Phase::Accepting,
            running: 0,
            live_workers: workers,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn running(&self) -> usize {
        self.running
    }

    pub fn live_workers(&self) -> usize {
        self.live_workers
    }

    /// No task is ready or running.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running == 0
    }

    pub fn submit(&mut self, spec: TaskSpec) -> Result<(TaskId, GraphStep)> {
        if self.phase != Phase::Accepting {
            return Err(OpqueueError::ShutDown);
        }
        let (id, step) = self.graph.register(spec)?;
        Ok((id, self.apply(step)))
    }

    pub fn add_dependency(&mut self, task: TaskId, dependency: TaskId) -> Result<GraphStep> {
        let step = self.graph.add_dependency(task, dependency)?;
        Ok(self.apply(step))
    }

    pub fn cancel(&mut self, id: TaskId) -> GraphStep {
        let step = self.graph.cancel(id);
        self.apply(step)
    }

    pub fn cancel_dependents(&mut self, id: TaskId) -> GraphStep {
        let step = self.graph.cancel_dependents(id);
        self.apply(step)
    }

    pub fn prune(&mut self) -> Vec<TaskId> {
        self.graph.prune()
    }

    /// Dequeue and start the next runnable task.
    ///
    /// Queue entries whose task is no longer `Ready` (cancelled between
    /// enqueue and dequeue) are discarded without running.
    pub fn next_task(&mut self) -> (NextTask, GraphStep) {
        while let Some(id) = self.queue.pop() {
            match self.graph.start(id) {
                Some((task, step)) => {
                    self.running += 1;
                    let step = self.apply(step);
                    return (NextTask::Start(task), step);
                }
                None => {
                    debug!(task = %id, "dequeued task is no longer ready; discarding");
                }
            }
        }

        let next = if self.workers_should_stop() {
            NextTask::Stop
        } else {
            NextTask::Wait
        };
        (next, GraphStep::new())
    }

    /// Record the result of a task previously returned by `next_task`.
    pub fn finish(&mut self, id: TaskId, result: std::result::Result<(), TaskError>) -> GraphStep {
        self.running = self.running.saturating_sub(1);
        let step = self.graph.finish(id, result);
        self.apply(step)
    }

    /// Stop accepting submissions.
    ///
    /// With `drain`, every queued task is cancelled (with its dependents) and
    /// so is anything promoted later. Calling again is a no-op, except that
    /// `drain = true` upgrades an earlier `drain = false`.
    pub fn shutdown(&mut self, drain: bool) -> GraphStep {
        match (self.phase, drain) {
            (Phase::Draining, _) | (Phase::Finishing, false) => GraphStep::new(),
            (Phase::Accepting, false) => {
                info!(queued = self.queue.len(), running = self.running, "shutdown: finishing queued work");
                self.phase = Phase::Finishing;
                GraphStep::new()
            }
            (_, true) => {
                info!(queued = self.queue.len(), running = self.running, "shutdown: draining ready queue");
                self.phase = Phase::Draining;
                let mut step = GraphStep::new();
                for id in self.queue.drain() {
                    step.extend(self.graph.cancel(id));
                }
                self.apply(step)
            }
        }
    }

    pub fn worker_exited(&mut self) {
        self.live_workers = self.live_workers.saturating_sub(1);
    }

    fn workers_should_stop(&self) -> bool {
        match self.phase {
            Phase::Accepting => false,
            Phase::Draining => true,
            // A running task may still promote dependents.
            Phase::Finishing => self.queue.is_empty() && self.running == 0,
        }
    }

    /// Mirror graph transitions into the ready queue.
    fn apply(&mut self, step: GraphStep) -> GraphStep {
        let mut transitions = step.transitions;
        let mut i = 0;

        while i < transitions.len() {
            let event = transitions[i].clone();
            match event.state {
                TaskState::Ready if self.phase == Phase::Draining => {
                    debug!(task = %event.task, "promoted while draining; cancelling");
                    let extra = self.graph.cancel(event.task);
                    transitions.extend(extra.transitions);
                }
                TaskState::Ready => {
                    self.queue.push(event.task, event.priority);
                }
                TaskState::Pending | TaskState::Cancelled => {
                    self.queue.remove(event.task);
                }
                TaskState::Running | TaskState::Completed | TaskState::Failed => {}
            }
            i += 1;
        }

        GraphStep { transitions }
    }
}
