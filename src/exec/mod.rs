// src/exec/mod.rs

//! Work execution layer.
//!
//! - [`work`] defines the work-unit type, the per-task [`TaskContext`] and
//!   the cooperative [`CancelFlag`].
//! - [`runner`] executes one started task on Tokio's blocking pool.
//! - [`simulated`] provides sleep-based work used by the plan runner.

pub mod runner;
pub mod simulated;
pub mod work;

pub use runner::run_task;
pub use simulated::SimulatedWork;
pub use work::{CancelFlag, TaskContext, Work};
