// src/dag/mod.rs

//! Dependency graph, task lifecycle and ready queue.
//!
//! - [`graph`] holds the directed acyclic graph of dependency edges.
//! - [`task_graph`] owns every task and decides when tasks become ready,
//!   records results and applies cancellation.
//! - [`task_info`] provides task metadata, submission specs and the handoff
//!   type given to workers.
//! - [`ready_queue`] is the priority-ordered queue of ready tasks.
//! - [`scheduler_step`] defines the result type for graph mutations.
//! - [`state_manager`] implements promotion and cascade cancellation.

pub mod graph;
pub mod ready_queue;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_graph;
pub mod task_info;

pub use graph::DagGraph;
pub use ready_queue::ReadyQueue;
pub use scheduler_step::GraphStep;
pub use task_graph::TaskGraph;
pub use task_info::{StartedTask, TaskSpec};
