// src/exec/runner.rs

//! Runs a single started task's work on the blocking pool.

use std::any::Any;

use tracing::{Instrument, debug, error, info, info_span};

use crate::dag::StartedTask;
use crate::errors::TaskError;

/// Execute the work of a started task and return what it reported.
///
/// The work runs inside `spawn_blocking`, so it may block freely. A panic in
/// the work is caught by Tokio and reported as a task error rather than
/// taking the worker down.
pub async fn run_task(task: StartedTask) -> Result<(), TaskError> {
    let StartedTask {
        id,
        priority,
        label,
        work,
        context,
    } = task;

    let span = info_span!("task", task = %id, label = label.as_deref().unwrap_or(""));

    async move {
        info!(?priority, "starting task");

        let blocking_span = tracing::Span::current();
        let joined = tokio::task::spawn_blocking(move || {
            let _entered = blocking_span.enter();
            work(&context)
        })
        .await;

        match joined {
            Ok(Ok(())) => {
                debug!("task work returned successfully");
                Ok(())
            }
            Ok(Err(err)) => {
                info!(error = %err, "task work reported an error");
                Err(err)
            }
            Err(join_err) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic());
                error!(panic = %message, "task work panicked");
                Err(TaskError::new(format!("task panicked: {message}")))
            }
            Err(join_err) => {
                error!(error = %join_err, "task work aborted");
                Err(TaskError::new(format!("task aborted: {join_err}")))
            }
        }
    }
    .instrument(span)
    .await
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
