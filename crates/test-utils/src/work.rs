#![allow(dead_code)]

//! Work units for driving the scheduler deterministically in tests.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use opqueue::{Scheduler, TaskContext, TaskError, TaskId, TaskState};

/// A latch that gated work blocks on until the test opens it.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }

    /// Block until the gate opens or `ctx` is cancelled.
    ///
    /// Returns `true` if the gate opened.
    pub fn wait(&self, ctx: &TaskContext) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock().unwrap();
        while !*open {
            if ctx.is_cancelled() {
                return false;
            }
            let (guard, _) = cvar.wait_timeout(open, Duration::from_millis(5)).unwrap();
            open = guard;
        }
        true
    }

    /// Work that blocks on this gate, then succeeds.
    pub fn work(&self) -> impl FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static {
        let gate = self.clone();
        move |ctx: &TaskContext| {
            gate.wait(ctx);
            Ok(())
        }
    }

    /// Work that blocks on this gate, records `name`, then succeeds.
    pub fn recorded_work(
        &self,
        log: &ExecutionLog,
        name: &str,
    ) -> impl FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static {
        let gate = self.clone();
        let log = log.clone();
        let name = name.to_string();
        move |ctx: &TaskContext| {
            gate.wait(ctx);
            log.push(&name);
            Ok(())
        }
    }
}

/// Shared record of the order in which work units started.
#[derive(Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str) {
        self.entries.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Work that records `name` and succeeds.
    pub fn work(&self, name: &str) -> impl FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static {
        let log = self.clone();
        let name = name.to_string();
        move |_ctx: &TaskContext| {
            log.push(&name);
            Ok(())
        }
    }

    /// Work that records `name` and fails with `message`.
    pub fn failing_work(
        &self,
        name: &str,
        message: &str,
    ) -> impl FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static {
        let log = self.clone();
        let name = name.to_string();
        let message = message.to_string();
        move |_ctx: &TaskContext| {
            log.push(&name);
            Err(TaskError::new(message))
        }
    }
}

/// Poll until `id` reaches `state`. Panics after 5 seconds.
pub async fn wait_for_state(scheduler: &Scheduler, id: TaskId, state: TaskState) {
    crate::with_timeout(async {
        while scheduler.status(id) != Some(state) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
}
