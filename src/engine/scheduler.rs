// src/engine/scheduler.rs

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::config::validate::validate_scheduler_config;
use crate::dag::{GraphStep, TaskSpec};
use crate::errors::{OpqueueError, Result, TaskError};
use crate::exec::TaskContext;
use crate::observe::{Interest, ObserverHub, SubscriptionHandle, TaskEvent};
use crate::types::{Priority, StateCounts, TaskId, TaskOutcome, TaskState};

use super::core::Phase;
use super::runtime::{Shared, worker_loop};

/// Handle to a dependency-aware task scheduler.
///
/// Cloning is cheap; all clones drive the same worker pool. A scheduler must
/// be created inside a Tokio runtime and should be stopped with
/// [`Scheduler::shutdown`].
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    config: Arc<SchedulerConfig>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("counts", &self.counts())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Start a scheduler with `config.workers` workers on the current Tokio
    /// runtime.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        validate_scheduler_config(&config)?;
        let runtime = Handle::try_current().map_err(anyhow::Error::from)?;

        let (observers, _dispatcher) = ObserverHub::spawn(&runtime);
        let shared = Arc::new(Shared::new(config.workers, observers));

        let workers = (0..config.workers)
            .map(|worker| runtime.spawn(worker_loop(worker, Arc::clone(&shared))))
            .collect();

        info!(name = %config.name, workers = config.workers, "scheduler started");

        Ok(Self {
            shared,
            workers: Arc::new(Mutex::new(workers)),
            config: Arc::new(config),
        })
    }

    /// Convenience for `Scheduler::new` with only the pool size set.
    pub fn with_workers(workers: usize) -> Result<Self> {
        Self::new(SchedulerConfig::with_workers(workers))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Submit a work unit that runs once every task in `deps` has completed.
    pub fn submit<F>(
        &self,
        work: F,
        priority: Priority,
        deps: impl IntoIterator<Item = TaskId>,
    ) -> Result<TaskId>
    where
        F: FnOnce(&TaskContext) -> std::result::Result<(), TaskError> + Send + 'static,
    {
        self.submit_task(TaskSpec::new(work).priority(priority).after_all(deps))
    }

    /// Submit a fully described task.
    ///
    /// Fails synchronously with `UnknownDependency`, `CycleDetected` or
    /// `ShutDown`; execution errors are only visible through `status`,
    /// `outcome` and subscriptions.
    pub fn submit_task(&self, spec: TaskSpec) -> Result<TaskId> {
        self.shared.commit(|core| match core.submit(spec) {
            Ok((id, step)) => (Ok(id), step),
            Err(err) => (Err(err), GraphStep::new()),
        })
    }

    /// Make a not-yet-started task wait for another one as well.
    pub fn add_dependency(&self, task: TaskId, dependency: TaskId) -> Result<()> {
        self.shared
            .commit(|core| match core.add_dependency(task, dependency) {
                Ok(step) => (Ok(()), step),
                Err(err) => (Err(err), GraphStep::new()),
            })
    }

    /// Cancel a task and everything that depends on it.
    ///
    /// A running task is only flagged; its work is expected to notice via
    /// [`TaskContext::is_cancelled`]. Idempotent.
    pub fn cancel(&self, id: TaskId) {
        debug!(task = %id, "cancel requested");
        self.shared.commit(|core| ((), core.cancel(id)));
    }

    /// Cancel everything that depends on `id`, but not `id` itself.
    ///
    /// Use this after a failure to release dependents that would otherwise
    /// stay `Pending` forever.
    pub fn cancel_dependents(&self, id: TaskId) {
        debug!(task = %id, "cancel of dependents requested");
        self.shared.commit(|core| ((), core.cancel_dependents(id)));
    }

    pub fn status(&self, id: TaskId) -> Option<TaskState> {
        self.shared.read(|core| core.graph().status(id))
    }

    pub fn outcome(&self, id: TaskId) -> Option<TaskOutcome> {
        self.shared.read(|core| core.graph().outcome(id))
    }

    pub fn label(&self, id: TaskId) -> Option<String> {
        self.shared
            .read(|core| core.graph().label_of(id))
            .map(|l| l.to_string())
    }

    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.shared.read(|core| core.graph().dependencies_of(id))
    }

    pub fn counts(&self) -> StateCounts {
        self.shared.read(|core| core.graph().counts())
    }

    /// Pending tasks that can never run because a dependency failed.
    pub fn stalled(&self) -> Vec<TaskId> {
        self.shared.read(|core| core.graph().stalled())
    }

    /// Forget terminal tasks whose dependents are all terminal.
    pub fn prune(&self) -> Vec<TaskId> {
        self.shared.commit(|core| (core.prune(), GraphStep::new()))
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.read(|core| core.phase() != Phase::Accepting)
    }

    pub fn subscribe<F>(&self, interest: Interest, handler: F) -> SubscriptionHandle
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        self.shared.observers().subscribe(interest, Arc::new(handler))
    }

    /// Subscribe with a channel instead of a callback.
    pub fn subscribe_channel(
        &self,
        interest: Interest,
    ) -> (SubscriptionHandle, mpsc::UnboundedReceiver<TaskEvent>) {
        self.shared.observers().subscribe_channel(interest)
    }

    /// Returns whether the subscription existed. Events not yet handed to the
    /// subscription are dropped, even when the same event already reached
    /// earlier subscribers.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.shared.observers().unsubscribe(handle)
    }

    /// Wait until a task reaches a terminal state and return that state.
    ///
    /// A task stalled behind a failed dependency never finishes; callers who
    /// need a bound should wrap this in `tokio::time::timeout`.
    pub async fn wait_for(&self, id: TaskId) -> Result<TaskState> {
        let known = self.shared.read(|core| core.graph().contains(id));
        if !known {
            return Err(OpqueueError::TaskNotFound(id));
        }

        self.shared
            .wait_until(|core| core.graph().status(id).is_none_or(TaskState::is_terminal))
            .await;

        self.status(id).ok_or(OpqueueError::TaskNotFound(id))
    }

    /// Wait until no task is ready or running.
    ///
    /// Tasks stalled in `Pending` do not keep the scheduler busy.
    pub async fn wait_idle(&self) {
        self.shared.wait_until(|core| core.is_idle()).await;
    }

    /// Stop accepting work and wait for every worker to exit.
    ///
    /// - `drain = true`: ready tasks (and anything promoted later) are
    ///   cancelled; running tasks finish normally.
    /// - `drain = false`: queued and newly promoted tasks still run until
    ///   nothing is ready or running.
    ///
    /// Submissions fail with `ShutDown` as soon as this is called.
    pub async fn shutdown(&self, drain: bool) {
        info!(drain, "shutdown requested");
        self.shared.commit(|core| ((), core.shutdown(drain)));

        let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker task ended abnormally");
                self.shared.commit(|core| {
                    core.worker_exited();
                    ((), GraphStep::new())
                });
            }
        }

        // Another caller may own the join handles; wait for the workers
        // through the shared state instead.
        self.shared.wait_until(|core| core.live_workers() == 0).await;
        info!(name = %self.config.name, counts = ?self.counts(), "scheduler shut down");
    }
}
