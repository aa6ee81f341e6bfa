// src/exec/simulated.rs

//! Simulated work used by the plan runner.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::errors::TaskError;
use crate::exec::TaskContext;

/// How often simulated work checks its cancellation flag.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Work that "runs" for a fixed duration and then succeeds or fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedWork {
    pub duration: Duration,
    /// If set, the work fails with this message after running.
    pub fail: Option<String>,
}

impl SimulatedWork {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail: None,
        }
    }

    pub fn failing(duration: Duration, message: impl Into<String>) -> Self {
        Self {
            duration,
            fail: Some(message.into()),
        }
    }

    /// Sleep in short slices, returning early once cancellation is requested.
    pub fn run(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Ok(());
        }

        let started = Instant::now();
        while started.elapsed() < self.duration {
            if ctx.is_cancelled() {
                info!(task = %ctx.id(), elapsed = ?started.elapsed(), "simulated work stopping early");
                return Ok(());
            }
            let remaining = self.duration.saturating_sub(started.elapsed());
            std::thread::sleep(remaining.min(POLL_INTERVAL));
        }

        debug!(task = %ctx.id(), duration = ?self.duration, "simulated work finished");

        match &self.fail {
            Some(message) => Err(TaskError::new(message.clone())),
            None => Ok(()),
        }
    }

    /// Turn into a closure suitable for submission.
    pub fn into_work(self) -> impl FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static {
        move |ctx: &TaskContext| self.run(ctx)
    }
}
