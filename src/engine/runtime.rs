// src/engine/runtime.rs

//! Async shell around [`CoreRuntime`]: shared state and the worker loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, watch};
use tracing::{debug, info};

use crate::dag::{GraphStep, StartedTask};
use crate::exec::run_task;
use crate::observe::ObserverHub;

use super::core::{CoreRuntime, NextTask};

/// State shared by the scheduler handle and its workers.
///
/// - `core` holds the graph and ready queue behind one lock.
/// - `work_available` wakes idle workers after a mutation.
/// - `changes` is bumped after every mutation so `wait_*` callers can
///   re-check their condition without polling.
#[derive(Debug)]
pub(crate) struct Shared {
    core: Mutex<CoreRuntime>,
    work_available: Notify,
    changes: watch::Sender<u64>,
    observers: ObserverHub,
}

impl Shared {
    pub(crate) fn new(workers: usize, observers: ObserverHub) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            core: Mutex::new(CoreRuntime::new(workers)),
            work_available: Notify::new(),
            changes,
            observers,
        }
    }

    pub(crate) fn observers(&self) -> &ObserverHub {
        &self.observers
    }

    /// Run a read-only query against the core.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&CoreRuntime) -> R) -> R {
        f(&*self.lock_core())
    }

    /// Mutate the core, publish the resulting transitions and wake everyone
    /// waiting on a change.
    ///
    /// Events are published before the lock is released, so the dispatcher
    /// sees them in transition order.
    pub(crate) fn commit<R>(&self, f: impl FnOnce(&mut CoreRuntime) -> (R, GraphStep)) -> R {
        let value = {
            let mut core = self.lock_core();
            let (value, step) = f(&mut *core);
            self.observers.publish(&step.transitions);
            value
        };
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
        self.work_available.notify_waiters();
        value
    }

    /// Wait for a ready task. Returns `None` once the worker should exit.
    pub(crate) async fn next_task(&self) -> Option<StartedTask> {
        loop {
            // Register interest before checking, so a push between the check
            // and the await is not missed.
            let notified = self.work_available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next = {
                let mut core = self.lock_core();
                let (next, step) = core.next_task();
                self.observers.publish(&step.transitions);
                next
            };

            match next {
                NextTask::Start(task) => {
                    self.changes.send_modify(|v| *v = v.wrapping_add(1));
                    return Some(task);
                }
                NextTask::Stop => return None,
                NextTask::Wait => notified.await,
            }
        }
    }

    /// Resolve once `pred` holds for the core.
    pub(crate) async fn wait_until(&self, pred: impl Fn(&CoreRuntime) -> bool) {
        let mut rx = self.changes.subscribe();
        loop {
            if self.read(&pred) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn lock_core(&self) -> MutexGuard<'_, CoreRuntime> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Worker loop: `Idle → (pop ready task) → Executing → Idle`, until the
/// scheduler shuts down.
pub(crate) async fn worker_loop(worker: usize, shared: Arc<Shared>) {
    debug!(worker, "worker started");

    while let Some(task) = shared.next_task().await {
        let id = task.id;
        debug!(worker, task = %id, "worker picked up task");
        let result = run_task(task).await;
        shared.commit(|core| ((), core.finish(id, result)));
    }

    shared.commit(|core| {
        core.worker_exited();
        ((), GraphStep::new())
    });
    info!(worker, "worker stopped");
}
