// src/engine/mod.rs

//! Execution engine for opqueue.
//!
//! This module ties together:
//! - the task graph and the ready queue (pure core, [`core`])
//! - the worker pool and shared state (async shell, `runtime`)
//! - the public [`Scheduler`] handle ([`scheduler`])
//!
//! All graph and queue mutation goes through one lock around
//! [`CoreRuntime`]; workers only hold it while picking up or finishing a
//! task, never while the work itself runs.

pub mod core;
mod runtime;
pub mod scheduler;

pub use self::core::{CoreRuntime, NextTask, Phase};
pub use scheduler::Scheduler;
